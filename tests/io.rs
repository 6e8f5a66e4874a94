//! Integration tests for the I/O context through the public API

use std::io::{Cursor, Write};

use rawk_io::{
    Error, Globals, IoConfig, IoContext, MemorySink, Record, Redirection, Runtime, SharedReader,
    SharedWriter, StdStreams, normalize_crlf,
};
use tempfile::NamedTempFile;

struct Run {
    ctx: IoContext,
    out: MemorySink,
    err: MemorySink,
}

fn run_with(config: IoConfig, stdin: &str) -> Run {
    let out = MemorySink::new();
    let err = MemorySink::new();
    let streams = StdStreams {
        stdin: SharedReader::new(Box::new(Cursor::new(stdin.as_bytes().to_vec()))),
        stdout: SharedWriter::new(Box::new(out.clone())),
        stderr: SharedWriter::new(Box::new(err.clone())),
    };
    Run {
        ctx: IoContext::new(config, streams).unwrap(),
        out,
        err,
    }
}

fn argv(args: &[&str]) -> Globals {
    let mut all = vec!["awk".to_string()];
    all.extend(args.iter().map(|s| s.to_string()));
    Globals::new(all)
}

fn collect(run: &mut Run, globals: &mut Globals) -> Vec<String> {
    let mut records = Vec::new();
    while run.ctx.next_record(globals).unwrap() {
        records.push(run.ctx.record().text().to_string());
    }
    records
}

fn file_with(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_newline_records_drop_carriage_return() {
    let mut run = run_with(IoConfig::default(), "a\r\nb\n");
    let mut globals = argv(&[]);
    assert_eq!(collect(&mut run, &mut globals), vec!["a", "b"]);
}

#[test]
fn test_paragraph_mode_collapses_blank_lines() {
    let mut run = run_with(IoConfig::default().with_rs(""), "a\nb\n\n\n\nc\n");
    let mut globals = argv(&[]);
    assert_eq!(collect(&mut run, &mut globals), vec!["a\nb", "c"]);
}

#[test]
fn test_single_byte_separator_returns_unterminated_tail() {
    let mut run = run_with(IoConfig::default().with_rs(";"), "x;y;z");
    let mut globals = argv(&[]);
    assert_eq!(collect(&mut run, &mut globals), vec!["x", "y", "z"]);
}

#[test]
fn test_assignment_then_stdin_then_file() {
    let file = file_with("from file\n");
    let path = file.path().to_str().unwrap();
    let mut run = run_with(IoConfig::default(), "hello\n");
    let mut globals = argv(&["a=1", "-", path]);

    assert!(run.ctx.next_record(&mut globals).unwrap());
    assert_eq!(globals.get("a"), Some("1"));
    assert_eq!(run.ctx.record().text(), "hello");
    assert_eq!(run.ctx.filename(), "");
    assert_eq!(run.ctx.sequencer().cursor().files_opened, 0);

    assert!(run.ctx.next_record(&mut globals).unwrap());
    assert_eq!(run.ctx.record().text(), "from file");
    assert_eq!(run.ctx.filename(), path);
    assert_eq!(run.ctx.fnr(), 1);
    assert_eq!(run.ctx.nr(), 2);
    assert_eq!(run.ctx.sequencer().cursor().files_opened, 1);

    assert!(!run.ctx.next_record(&mut globals).unwrap());
}

#[test]
fn test_argv_growth_is_seen() {
    let file = file_with("late\n");
    let mut run = run_with(IoConfig::default(), "");
    let mut globals = argv(&["v=0"]);
    globals.set_argv(2, file.path().to_str().unwrap());
    assert_eq!(globals.argc(), 3);
    assert_eq!(collect(&mut run, &mut globals), vec!["late"]);
}

#[test]
fn test_rs_assignment_applies_to_next_file() {
    let first = file_with("a;b\n");
    let second = file_with("c;d");
    let mut run = run_with(IoConfig::default(), "");
    let mut globals = argv(&[
        first.path().to_str().unwrap(),
        "RS=;",
        second.path().to_str().unwrap(),
    ]);
    assert_eq!(collect(&mut run, &mut globals), vec!["a;b", "c", "d"]);
}

#[test]
fn test_missing_file_is_an_open_error() {
    let mut run = run_with(IoConfig::default(), "");
    let mut globals = argv(&["/no/such/input"]);
    match run.ctx.next_record(&mut globals) {
        Err(Error::Open { name, .. }) => assert_eq!(name, "/no/such/input"),
        other => panic!("expected open error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_nextfile_moves_to_next_argument() {
    let first = file_with("1\n2\n3\n");
    let second = file_with("4\n");
    let mut run = run_with(IoConfig::default(), "");
    let mut globals = argv(&[first.path().to_str().unwrap(), second.path().to_str().unwrap()]);
    assert!(run.ctx.next_record(&mut globals).unwrap());
    run.ctx.skip_file();
    assert!(run.ctx.next_record(&mut globals).unwrap());
    assert_eq!(run.ctx.record().text(), "4");
    assert_eq!(run.ctx.fnr(), 1);
}

#[test]
fn test_same_destination_opens_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");
    let name = path.to_str().unwrap();
    let mut run = run_with(IoConfig::default(), "");

    run.ctx.print("one", Some((Redirection::Truncate, name))).unwrap();
    run.ctx.print("two", Some((Redirection::Truncate, name))).unwrap();
    run.ctx.write("three\n", Some((Redirection::Append, name))).unwrap();

    assert_eq!(run.ctx.registry().open_count(), 1);
    run.ctx.shutdown();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\n");
}

#[test]
fn test_reading_from_writer_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("both.txt");
    let name = path.to_str().unwrap();
    let mut run = run_with(IoConfig::default(), "");
    run.ctx.print("x", Some((Redirection::Truncate, name))).unwrap();
    assert!(matches!(
        run.ctx.getline_from(name, Redirection::ReadFile),
        Err(Error::ReadFromWriter { .. })
    ));
}

#[test]
fn test_failed_spawn_discards_and_reports_once() {
    let config = IoConfig::default().with_shell("/nonexistent/shell-for-rawk-io");
    let mut run = run_with(config, "");

    run.ctx.print("lost", Some((Redirection::PipeTo, "cat"))).unwrap();
    run.ctx.print("also lost", Some((Redirection::PipeTo, "cat"))).unwrap();
    let summary = run.ctx.shutdown();

    assert_eq!(run.out.contents(), "");
    assert_eq!(run.err.contents().lines().count(), 1);
    assert_eq!(summary.streams_closed, 1);
    assert_eq!(summary.commands_waited, 0);
}

#[test]
fn test_failed_spawn_reader_is_empty() {
    let config = IoConfig::default().with_shell("/nonexistent/shell-for-rawk-io");
    let mut run = run_with(config, "");
    assert_eq!(run.ctx.getline_from("echo hi", Redirection::PipeFrom).unwrap(), None);
    assert_eq!(run.ctx.nr(), 0);
}

#[test]
fn test_crlf_normalization_is_idempotent() {
    let once = normalize_crlf("a\nb\r\nc\n").into_owned();
    let twice = normalize_crlf(&once).into_owned();
    assert_eq!(once, "a\r\nb\r\nc\r\n");
    assert_eq!(once, twice);
}

#[cfg(unix)]
#[test]
fn test_pipe_output_is_forwarded_before_shutdown_returns() {
    let mut run = run_with(IoConfig::default(), "");
    run.ctx.print("b", Some((Redirection::PipeTo, "sort"))).unwrap();
    run.ctx.print("a", Some((Redirection::PipeTo, "sort"))).unwrap();
    let summary = run.ctx.shutdown();
    assert_eq!(summary.commands_waited, 1);
    assert_eq!(run.out.contents(), "a\nb\n");
}

#[cfg(unix)]
#[test]
fn test_close_returns_exit_status_and_allows_reopen() {
    let mut run = run_with(IoConfig::default(), "");
    run.ctx.print("x", Some((Redirection::PipeTo, "cat >/dev/null; exit 5"))).unwrap();
    assert_eq!(run.ctx.close("cat >/dev/null; exit 5"), 5);
    assert_eq!(run.ctx.close("cat >/dev/null; exit 5"), -1);

    let first = run.ctx.getline_from("echo again", Redirection::PipeFrom).unwrap();
    assert_eq!(first, Some(Record::Text("again".into())));
    assert_eq!(run.ctx.close("echo again"), 0);
    let reopened = run.ctx.getline_from("echo again", Redirection::PipeFrom).unwrap();
    assert_eq!(reopened, Some(Record::Text("again".into())));
}

#[cfg(unix)]
#[test]
fn test_shutdown_after_errors_closes_everything_once() {
    let dir = tempfile::tempdir().unwrap();
    let file_a = dir.path().join("a.txt");
    let file_b = dir.path().join("b.txt");
    let mut run = run_with(IoConfig::default(), "");

    run.ctx
        .print("a", Some((Redirection::Truncate, file_a.to_str().unwrap())))
        .unwrap();
    run.ctx
        .print("b", Some((Redirection::Append, file_b.to_str().unwrap())))
        .unwrap();
    run.ctx.print("p", Some((Redirection::PipeTo, "cat >/dev/null"))).unwrap();
    run.ctx.getline_from("echo r", Redirection::PipeFrom).unwrap();

    // Errors along the way leave the registry intact
    assert!(run.ctx.getline_from(file_a.to_str().unwrap(), Redirection::ReadFile).is_err());
    assert!(run.ctx.print("q", Some((Redirection::Truncate, "echo r"))).is_err());
    assert!(run.ctx.print("z", Some((Redirection::Truncate, "/no/such/dir/f"))).is_err());

    let summary = run.ctx.shutdown();
    assert_eq!(summary.streams_closed, 4);
    assert_eq!(summary.commands_waited, 2);
    assert!(run.ctx.registry().is_empty());
    assert_eq!(run.ctx.shutdown().streams_closed, 0);
    assert_eq!(std::fs::read_to_string(&file_a).unwrap(), "a\n");
}

#[test]
fn test_json_records() {
    let config = IoConfig::default().with_rs(rawk_io::JSON_RS);
    let mut run = run_with(config, "{\"name\":\"x\",\"n\":2}\nnull\n");
    let mut globals = argv(&[]);

    assert!(run.ctx.next_record(&mut globals).unwrap());
    assert!(run.ctx.record().is_object());
    assert_eq!(run.ctx.record().json_field("name"), Some("x"));
    assert_eq!(run.ctx.record().json_field("n"), Some("2"));

    assert!(run.ctx.next_record(&mut globals).unwrap());
    assert!(run.ctx.record().is_no_object());

    assert!(!run.ctx.next_record(&mut globals).unwrap());
}

#[test]
fn test_fieldwidths_assignment() {
    let mut run = run_with(IoConfig::default(), "abcdef\n");
    let mut globals = argv(&["FIELDWIDTHS=2 3"]);
    assert!(run.ctx.next_record(&mut globals).unwrap());
    assert_eq!(run.ctx.record().fields(), &["ab", "cde"]);
}

#[test]
fn test_sandbox_blocks_argv_files() {
    let file = file_with("data\n");
    let mut run = run_with(IoConfig::default().with_no_file_reads(true), "");
    let mut globals = argv(&[file.path().to_str().unwrap()]);
    assert!(matches!(
        run.ctx.next_record(&mut globals),
        Err(Error::FileReadsDisabled)
    ));
    assert!(run.err.contents().is_empty());
}
