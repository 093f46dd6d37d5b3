use std::sync::Arc;

use dockfix_recipes::recipe_from_options;
use dockfix_rewrite::apply;
use dockfix_rewrite::apply_all;
use dockfix_rewrite::Recipe;
use dockfix_syntax::parse;
use dockfix_syntax::print;
use serde_json::json;
use serde_json::Value;

fn recipe(name: &str, options: Value) -> Box<dyn Recipe> {
    recipe_from_options(name, options).unwrap_or_else(|err| panic!("{err}"))
}

/// Run a recipe and check that running it again changes nothing.
fn rewrite(name: &str, options: Value, before: &str) -> String {
    let recipe = recipe(name, options);
    let document = Arc::new(parse(before).unwrap());
    assert_eq!(print(&document), before);

    let first = apply(recipe.as_ref(), &document).unwrap();
    let second = apply(recipe.as_ref(), &first.document).unwrap();
    assert!(!second.changed, "{name} is not idempotent");
    print(&first.document)
}

#[test]
fn test_package_cache_cleanup() {
    let after = rewrite(
        "add-package-cache-cleanup",
        Value::Null,
        "FROM debian\nRUN apt-get update && apt-get install -y curl\n",
    );
    assert_eq!(
        after,
        "FROM debian\nRUN apt-get update && apt-get install -y curl && rm -rf /var/lib/apt/lists/*\n"
    );
}

#[test]
fn test_combine_runs() {
    let merged = rewrite(
        "combine-run-instructions",
        json!({}),
        "FROM alpine\nRUN a\nRUN b\n",
    );
    assert_eq!(merged, "FROM alpine\nRUN a && b\n");

    let split = "FROM alpine\nRUN a\nCOPY x /x\nRUN b\n";
    assert_eq!(rewrite("combine-run-instructions", json!({}), split), split);
}

#[test]
fn test_change_base_image() {
    let options = json!({"old_image_name": "ubuntu:20.04", "new_image_name": "ubuntu:22.04"});
    assert_eq!(
        rewrite("change-base-image", options, "FROM ubuntu:20.04\n"),
        "FROM ubuntu:22.04\n"
    );

    let options = json!({"old_image_name": "ubuntu:*", "new_image_name": "ubuntu:22.04"});
    assert_eq!(
        rewrite("change-base-image", options, "FROM ubuntu:${TAG}\n"),
        "FROM ubuntu:22.04\n"
    );
}

#[test]
fn test_add_to_copy() {
    let archive = "FROM alpine\nADD archive.tar.gz /app/\n";
    assert_eq!(rewrite("replace-add-with-copy", Value::Null, archive), archive);
    assert_eq!(
        rewrite("replace-add-with-copy", Value::Null, "FROM alpine\nADD app.jar /app/\n"),
        "FROM alpine\nCOPY app.jar /app/\n"
    );
}

#[test]
fn test_exec_form() {
    assert_eq!(
        rewrite(
            "convert-to-exec-form",
            Value::Null,
            "FROM alpine\nENTRYPOINT /app/server --port 8080\n"
        ),
        "FROM alpine\nENTRYPOINT [\"/app/server\", \"--port\", \"8080\"]\n"
    );
}

#[test]
fn test_user_goes_to_the_final_stage() {
    let after = rewrite(
        "add-user-instruction",
        json!({"user": "appuser"}),
        "FROM golang AS builder\nRUN go build -o /app\nFROM alpine\nCOPY --from=builder /app /app\n",
    );
    assert_eq!(
        after,
        "FROM golang AS builder\nRUN go build -o /app\nFROM alpine\nCOPY --from=builder /app /app\nUSER appuser\n"
    );
}

#[test]
fn test_invalid_options_stop_the_run() {
    let recipe = recipe(
        "change-base-image",
        json!({"old_image_name": "ubuntu", "new_tag": "22.04", "new_digest": "sha256:abc"}),
    );
    let document = Arc::new(parse("FROM ubuntu\n").unwrap());
    let err = apply(recipe.as_ref(), &document).unwrap_err();
    assert_eq!(err.diagnostic_code(), "R100");
}

#[test]
fn test_pipeline() {
    let recipes = vec![
        recipe(
            "change-base-image",
            json!({"old_image_name": "ubuntu:20.04", "new_tag": "22.04"}),
        ),
        recipe("combine-run-instructions", Value::Null),
        recipe("add-no-install-recommends", Value::Null),
        recipe("add-package-cache-cleanup", Value::Null),
        recipe("replace-maintainer-with-label", Value::Null),
        recipe("replace-add-with-copy", Value::Null),
        recipe("remove-exposed-port", json!({"port": "22"})),
        recipe("add-user-instruction", json!({"user": "appuser"})),
        recipe("convert-to-exec-form", Value::Null),
    ];
    let before = include_str!("fixtures/service.Dockerfile");
    let document = Arc::new(parse(before).unwrap());

    let run = apply_all(&recipes, &document).unwrap();
    assert!(run.changed);
    assert_eq!(print(&run.document), include_str!("fixtures/service.fixed.Dockerfile"));

    let again = apply_all(&recipes, &run.document).unwrap();
    assert!(!again.changed);
}
