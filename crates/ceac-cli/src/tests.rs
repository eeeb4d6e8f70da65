use super::*;

#[test]
fn parses_query_command() {
    let cli = Cli::try_parse_from([
        "ceac-cli",
        "query",
        "--location",
        "BEJ",
        "--case",
        "AA00A38G49",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Query {
            ref location,
            passport: None,
            manual_captcha: false,
            ..
        } if location == "BEJ"
    ));
}

#[test]
fn query_passport_requires_surname() {
    let result = Cli::try_parse_from([
        "ceac-cli",
        "query",
        "--location",
        "BEJ",
        "--case",
        "AA00A38G49",
        "--passport",
        "E1",
    ]);
    assert!(result.is_err());
}

#[test]
fn query_rejects_plain_and_encrypted_together() {
    let result = Cli::try_parse_from([
        "ceac-cli",
        "query",
        "--location",
        "BEJ",
        "--case",
        "AA00A38G49",
        "--passport",
        "E1",
        "--surname",
        "LI",
        "--encrypted",
        "b64==",
    ]);
    assert!(result.is_err());
}

#[test]
fn parses_batch_command_with_manual_captcha() {
    let cli = Cli::try_parse_from([
        "ceac-cli",
        "batch",
        "--file",
        "requests.json",
        "--manual-captcha",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Batch {
            manual_captcha: true,
            ..
        }
    ));
}

#[test]
fn remote_chunk_size_defaults_to_ten() {
    let cli = Cli::try_parse_from([
        "ceac-cli",
        "remote",
        "--url",
        "http://127.0.0.1:9000/",
        "--file",
        "requests.json",
    ])
    .expect("expected valid cli args");

    assert!(matches!(
        cli.command,
        Commands::Remote { chunk_size: 10, .. }
    ));
}

#[test]
fn missing_subcommand_is_an_error() {
    assert!(Cli::try_parse_from(["ceac-cli"]).is_err());
}
