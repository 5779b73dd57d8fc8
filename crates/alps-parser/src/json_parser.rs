use alps_core::{AlpsError, SourceFormat};
use serde_json::Value;

/// Parse JSON text into a generic value.
pub fn parse_json_value(input: &str) -> Result<Value, AlpsError> {
    let trimmed = input.trim_start_matches('\u{feff}');
    serde_json::from_str(trimmed).map_err(|err| {
        AlpsError::syntax(
            SourceFormat::Json,
            format!(
                "{} at line {}, column {}",
                describe_category(&err),
                err.line(),
                err.column()
            ),
        )
    })
}

fn describe_category(err: &serde_json::Error) -> String {
    use serde_json::error::Category;

    match err.classify() {
        Category::Eof => "unexpected end of input".to_string(),
        Category::Syntax | Category::Data | Category::Io => {
            // serde_json appends its own position; strip it so ours is the only one.
            let message = err.to_string();
            match message.rfind(" at line ") {
                Some(index) => message[..index].to_string(),
                None => message,
            }
        }
    }
}
