// End-to-end command scenarios over both engines

mod common;

use common::CliFixture;
use drop_cli::transfer::VALUE_PROMPT;
use drop_cli::upsert::OVERWRITE_PROMPT;
use drop_cli::{Channel, Operation, Selection};

const BACKEND_FILES: &[&str] = &["drop.dbm", "drop.tcb"];

fn add(key: &str) -> Operation {
    Operation::Add {
        key: key.to_string(),
        channel: Channel::Console,
    }
}

fn print(key: &str) -> Operation {
    Operation::Print {
        key: Some(key.to_string()),
        channel: Channel::Console,
    }
}

fn delete(key: &str) -> Operation {
    Operation::Delete {
        key: key.to_string(),
    }
}

#[test]
fn test_alpha_lifecycle() {
    for name in BACKEND_FILES {
        let mut fx = CliFixture::new(name);

        let t = fx.run(add("alpha"), &["one"]);
        assert_eq!(t.prompts, vec![VALUE_PROMPT]);
        assert!(t.stderr.is_empty());
        assert_eq!(fx.run(print("alpha"), &[]).stdout, "one\n");

        // Conflict, declined
        let t = fx.run(add("alpha"), &["two", "n"]);
        assert_eq!(t.prompts, vec![VALUE_PROMPT, OVERWRITE_PROMPT]);
        assert_eq!(fx.run(print("alpha"), &[]).stdout, "one\n");

        // Conflict, confirmed
        fx.run(add("alpha"), &["two", "y"]);
        assert_eq!(fx.run(print("alpha"), &[]).stdout, "two\n");

        let t = fx.run(delete("alpha"), &[]);
        assert!(t.stderr.is_empty(), "{}: {}", name, t.stderr);

        let t = fx.run(print("alpha"), &[]);
        assert_eq!(t.stdout, "");
        assert_eq!(t.stderr, "'alpha' does not exist.\n");
    }
}

#[test]
fn test_empty_confirmation_declines() {
    let mut fx = CliFixture::new("drop.dbm");
    fx.run(add("k"), &["old"]);
    fx.run(add("k"), &["new", ""]);
    assert_eq!(fx.run(print("k"), &[]).stdout, "old\n");
}

#[test]
fn test_value_prompt_repeats_until_non_empty() {
    let mut fx = CliFixture::new("drop.dbm");
    let t = fx.run(add("k"), &["", "", "value with spaces"]);
    assert_eq!(t.prompts.len(), 3);
    assert_eq!(fx.run(print("k"), &[]).stdout, "value with spaces\n");
}

#[test]
fn test_end_of_input_adds_nothing() {
    let mut fx = CliFixture::new("drop.dbm");
    let t = fx.run(add("k"), &[""]);
    assert!(t.stderr.is_empty());
    assert_eq!(fx.run(Operation::List, &[]).stdout, "Database is empty.\n");
}

#[test]
fn test_key_truncated_at_whitespace() {
    let mut fx = CliFixture::new("drop.tcb");
    fx.run(add("foo bar"), &["v"]);
    assert_eq!(fx.run(print("foo"), &[]).stdout, "v\n");
    assert_eq!(fx.run(print("foo baz"), &[]).stdout, "v\n");
    assert_eq!(fx.run(Operation::List, &[]).stdout, "foo\n");
}

#[test]
fn test_delete_missing_key_reports() {
    for name in BACKEND_FILES {
        let mut fx = CliFixture::new(name);
        let t = fx.run(delete("ghost"), &[]);
        assert!(
            t.stderr.starts_with("Could not delete 'ghost': "),
            "{}: {}",
            name,
            t.stderr
        );
        assert!(t.stderr.len() > "Could not delete 'ghost': \n".len());
    }
}

#[test]
fn test_list_empty_database() {
    for name in BACKEND_FILES {
        let mut fx = CliFixture::new(name);
        assert_eq!(fx.run(Operation::List, &[]).stdout, "Database is empty.\n");
        assert_eq!(fx.run(Operation::FullList, &[]).stdout, "Database is empty.\n");
    }
}

#[test]
fn test_btree_full_list_sorted_and_padded() {
    let mut fx = CliFixture::new("drop.tcb");
    fx.run(add("b"), &["2"]);
    fx.run(add("a"), &["1"]);
    fx.run(add("averyverylongkey"), &["x"]);

    let t = fx.run(Operation::FullList, &[]);
    assert_eq!(
        t.stdout,
        "a:          1\naveryverylongkey: x\nb:          2\n"
    );
}

#[test]
fn test_hash_list_contains_every_key() {
    let mut fx = CliFixture::new("drop.dbm");
    for i in 0..25 {
        fx.run(add(&format!("key{}", i)), &["v"]);
    }

    let listed = fx.run(Operation::List, &[]).stdout;
    let mut keys: Vec<&str> = listed.lines().collect();
    keys.sort();
    let mut expected: Vec<String> = (0..25).map(|i| format!("key{}", i)).collect();
    expected.sort();
    assert_eq!(keys, expected);
}

#[test]
fn test_print_without_key_does_nothing() {
    let mut fx = CliFixture::new("drop.dbm");
    let t = fx.run(
        Operation::Print {
            key: None,
            channel: Channel::Console,
        },
        &[],
    );
    assert!(t.stdout.is_empty() && t.stderr.is_empty());
}

#[test]
fn test_selection_round_trip() {
    let mut fx = CliFixture::new("drop.dbm");
    fx.selections.set(Selection::Clipboard, "from clipboard");

    fx.run(
        Operation::Add {
            key: "clip".to_string(),
            channel: Channel::Selection(Selection::Clipboard),
        },
        &[],
    );

    let t = fx.run(
        Operation::Print {
            key: Some("clip".to_string()),
            channel: Channel::Selection(Selection::Primary),
        },
        &[],
    );
    assert!(t.stdout.is_empty());
    assert_eq!(fx.selections.get(Selection::Primary), Some("from clipboard"));
}

#[test]
fn test_empty_selection_adds_nothing() {
    let mut fx = CliFixture::new("drop.dbm");
    let t = fx.run(
        Operation::Add {
            key: "k".to_string(),
            channel: Channel::Selection(Selection::Primary),
        },
        &[],
    );
    assert!(t.prompts.is_empty());
    assert_eq!(fx.run(print("k"), &[]).stderr, "'k' does not exist.\n");
}
