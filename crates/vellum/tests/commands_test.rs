use std::time::Duration;

use vellum::commands::blocks::list_blocks;
use vellum::commands::compute::ComputeCommand;
use vellum::commands::inspect::describe;
use vellum::commands::preferences::{reset, show};
use vellum_core::backends::{BackendError, ComputeFormat, ComputeResult};
use vellum_core::preferences::Preferences;
use vellum_core::test_utils::StubCompute;
use vellum_core::test_utils::ast::{assign, call, print, print_call_json, program, string};

#[test]
fn inspect_reports_descriptors_and_non_calls() {
    let source = program(vec![
        print(call(
            "default_api",
            "mermaid_render",
            vec![assign("mermaid_code", string("graph TD; A-->B"))],
        )),
        call("other_api", "katex_render", vec![assign("katex_code", string("x"))]),
        string("just text"),
    ])
    .to_json_pretty();

    let report = describe(&source, "default_api").unwrap();
    assert_eq!(report.len(), 3);
    assert!(report[0].starts_with("[0] {"));
    assert!(report[0].contains("\"function_name\": \"mermaid_render\""));
    assert!(report[0].contains("\"print_call\": true"));
    assert!(report[1].contains("outside the `default_api` namespace"));
    assert!(report[2].starts_with("[2] not a tool call"));
}

#[test]
fn inspect_rejects_invalid_json() {
    assert!(describe("print(", "default_api").is_err());
}

#[test]
fn blocks_are_listed_in_order() {
    let message = format!(
        "Intro\n```tool_code\n{}\n```\nmore\n```tool_code\nprint(default_api.katex_render(",
        print_call_json("mermaid_render", &[("mermaid_code", "graph TD; A-->B")])
    );

    let complete = list_blocks(&message, false);
    assert_eq!(complete.len(), 1);
    assert!(!complete[0].0);

    let all = list_blocks(&message, true);
    assert_eq!(all.len(), 2);
    assert_eq!(all[1], (true, "print(default_api.katex_render(".to_string()));
}

fn command(query: &str, format: ComputeFormat) -> ComputeCommand {
    ComputeCommand {
        query: query.to_string(),
        image_only: false,
        format,
        endpoint: "wss://localhost/unused".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn compute_formats_results() {
    let backend = StubCompute::new(vec![ComputeResult {
        title: Some("Result".to_string()),
        plaintext: Some("4".to_string()),
        ..Default::default()
    }])
    .with_delay(Duration::from_millis(50));

    let html = command("2+2", ComputeFormat::Html).run(&backend).await.unwrap();
    assert!(html.contains("<h2>Result</h2>"));

    let markdown = command("2+2", ComputeFormat::Markdown)
        .run(&backend)
        .await
        .unwrap();
    assert!(markdown.starts_with("Result\n"));
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn compute_rejects_empty_query_and_surfaces_failures() {
    let backend = StubCompute::failing(BackendError::Timeout("no reply".to_string()));

    assert!(command("  ", ComputeFormat::Html).run(&backend).await.is_err());
    assert_eq!(backend.calls(), 0);

    let err = command("2+2", ComputeFormat::Html)
        .run(&backend)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no reply"));
}

#[test]
fn preferences_show_and_reset_use_the_given_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("preferences.toml");

    let shown = show(&path).unwrap();
    assert!(shown.starts_with(&format!("Preferences file: {}", path.display())));
    assert!(shown.contains("max_retries = 3"));
    assert!(!path.exists());

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, "[render]\nmax_retries = 7\n\n[compute]\nformat = \"markdown\"\n").unwrap();
    let shown = show(&path).unwrap();
    assert!(shown.contains("max_retries = 7"));
    assert!(shown.contains("format = \"markdown\""));

    let message = reset(&path).unwrap();
    assert!(message.contains(&path.display().to_string()));
    assert_eq!(Preferences::load_from(&path).unwrap(), Preferences::default());
}
