use assert_cmd::Command;
use std::io::Write;

fn run(req: &serde_json::Value, envs: &[(&str, &str)]) -> anyhow::Result<String> {
    let mut cmd = Command::cargo_bin("github-deps-mcp")?;
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("GH_TOKEN")
        .env_remove("GITHUB_READ_ONLY");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let input = serde_json::to_string(req)?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin({
            let mut b = Vec::new();
            writeln!(b, "{}", input).unwrap();
            b
        })
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    Ok(output)
}

#[test]
fn initialize_and_tools_list() -> anyhow::Result<()> {
    let init_req = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "id": 1
    });
    let out = run(&init_req, &[])?;
    assert!(out.contains("\"protocolVersion\""));
    assert!(out.contains("\"github-deps-mcp\""));

    let list_req = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "tools/list",
        "id": 2
    });
    let out = run(&list_req, &[])?;
    let v: serde_json::Value = serde_json::from_str(&out)?;
    let names: Vec<&str> = v["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "issue_dependencies.list_blocked_by",
            "issue_dependencies.list_blocking",
            "issue_dependencies.add_blocked_by",
            "issue_dependencies.remove_blocked_by",
        ]
    );
    assert_eq!(v["result"]["tools"][0]["annotations"]["readOnlyHint"], true);
    assert_eq!(v["result"]["tools"][2]["annotations"]["readOnlyHint"], false);
    Ok(())
}

#[test]
fn read_only_flag_and_env_hide_mutations() -> anyhow::Result<()> {
    let list_req = serde_json::json!({"jsonrpc":"2.0","method":"tools/list","id":1});
    let out = run(&list_req, &[("GITHUB_READ_ONLY", "true")])?;
    assert!(out.contains("issue_dependencies.list_blocking"));
    assert!(!out.contains("issue_dependencies.add_blocked_by"));

    let mut cmd = Command::cargo_bin("github-deps-mcp")?;
    let assert = cmd
        .env_remove("GITHUB_READ_ONLY")
        .args(["--log-level", "warn", "--read-only"])
        .write_stdin(format!("{}\n", list_req))
        .assert()
        .success();
    let out = String::from_utf8(assert.get_output().stdout.clone())?;
    assert!(!out.contains("issue_dependencies.remove_blocked_by"));
    Ok(())
}

#[test]
fn translated_titles_and_export() -> anyhow::Result<()> {
    let list_req = serde_json::json!({"jsonrpc":"2.0","method":"tools/list","id":1});
    let out = run(
        &list_req,
        &[(
            "GITHUB_MCP_TOOL_ISSUE_DEPENDENCIES_LIST_BLOCKING_TITLE",
            "Downstream issues",
        )],
    )?;
    assert!(out.contains("\"Downstream issues\""));

    let mut cmd = Command::cargo_bin("github-deps-mcp")?;
    let assert = cmd
        .env(
            "GITHUB_MCP_TOOL_ISSUE_DEPENDENCIES_ADD_BLOCKED_BY_TITLE",
            "Block",
        )
        .arg("--export-translations")
        .assert()
        .success();
    let exported: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout)?;
    assert_eq!(
        exported["TOOL_ISSUE_DEPENDENCIES_ADD_BLOCKED_BY_TITLE"],
        "Block"
    );
    assert_eq!(
        exported["TOOL_ISSUE_DEPENDENCIES_LIST_BLOCKED_BY_DESCRIPTION"],
        "List issues that a given issue is blocked by."
    );
    Ok(())
}

#[test]
fn tools_call_without_token_is_internal_error() -> anyhow::Result<()> {
    let req = serde_json::json!({
        "jsonrpc":"2.0","method":"tools/call","id":1,
        "params":{"name":"issue_dependencies.list_blocked_by","arguments":{"owner":"o","repo":"r","issue_number":1}}
    });
    let out = run(&req, &[])?;
    let v: serde_json::Value = serde_json::from_str(&out)?;
    assert_eq!(v["error"]["code"], -32603);
    assert!(v["error"]["message"]
        .as_str()
        .unwrap()
        .contains("GITHUB_TOKEN"));
    Ok(())
}
