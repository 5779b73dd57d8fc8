#![no_main]

use alps_render_dot::{DotRenderConfig, LabelMode, render_dot_with_config};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(parsed) = alps_parser::parse(text, None) else {
        return;
    };
    let model = alps_graph::build_model(&alps_resolver::resolve_local(&parsed.document));
    for label_mode in [LabelMode::Id, LabelMode::Title] {
        let config = DotRenderConfig {
            label_mode,
            ..DotRenderConfig::default()
        };
        let dot = render_dot_with_config(&model, &config);
        assert!(dot.starts_with("digraph "));
        assert!(dot.ends_with("}\n"));
    }
});
