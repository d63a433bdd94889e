use super::*;
use clap::CommandFactory;

fn laws(args: &[&str]) -> LawsCommand {
    let argv = ["lawassist", "laws"].into_iter().chain(args.iter().copied());
    match Cli::try_parse_from(argv).map(|cli| cli.command) {
        Ok(Some(Command::Laws(cmd))) => cmd,
        other => panic!("unexpected parse: {other:?}"),
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn chat_is_the_default_command() {
    let cli = Cli::try_parse_from(["lawassist"]).unwrap();
    assert!(cli.command.is_none());
    assert!(!cli.verbose);
}

#[test]
fn search_takes_a_positional_query() {
    let cmd = laws(&["search", "right to information", "--json"]);
    assert!(cmd.json);
    assert!(matches!(cmd.command, LawsSubcommand::Search { query } if query == "right to information"));
}

#[test]
fn delete_takes_a_numeric_id() {
    assert!(matches!(laws(&["delete", "42"]).command, LawsSubcommand::Delete { id: 42 }));
    assert!(Cli::try_parse_from(["lawassist", "laws", "delete", "forty-two"]).is_err());
}

#[test]
fn add_requires_title_category_and_description() {
    let cmd = laws(&["add", "--title", "RTI Act", "--category", "Governance", "--description", "Records"]);
    assert!(matches!(
        cmd.command,
        LawsSubcommand::Add { ref title, link: None, id: None, .. } if title == "RTI Act"
    ));
    assert!(Cli::try_parse_from(["lawassist", "laws", "add", "--title", "RTI Act"]).is_err());
}
