use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Position};

fn spawn_frontend(extra_args: &[&str]) -> Child {
    let exe = env!("CARGO_BIN_EXE_uci_frontend");
    Command::new(exe)
        .args(extra_args)
        .env_remove("UCI_DEBUG")
        .env_remove("UCI_INIT_COMMANDS")
        .env_remove("UCI_PERFT_DATA")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to spawn front-end binary")
}

/// Read until a line starting with `prefix`; returns everything read and
/// the matching line.
fn read_until(reader: &mut BufReader<ChildStdout>, prefix: &str) -> (String, Option<String>) {
    let mut output = String::new();
    loop {
        let mut line = String::new();
        let bytes = reader.read_line(&mut line).expect("read failed");
        if bytes == 0 {
            return (output, None);
        }
        output.push_str(&line);
        if line.starts_with(prefix) {
            return (output, Some(line));
        }
    }
}

fn assert_legal(fen: &str, moves: &[&str], bestmove_line: &str) {
    let parts: Vec<&str> = bestmove_line.split_whitespace().collect();
    assert!(parts.len() >= 2, "bestmove missing move: {bestmove_line}");
    let mv = parts[1];
    assert_ne!(mv, "0000", "front-end returned null move");

    let fen: Fen = fen.parse().expect("valid fen");
    let mut pos: Chess = fen
        .into_position(CastlingMode::Standard)
        .expect("legal position");
    for played in moves {
        let played: UciMove = played.parse().expect("uci move");
        let played = played.to_move(&pos).expect("legal move");
        pos = pos.play(&played).expect("playable move");
    }
    let best: UciMove = mv.parse().expect("bestmove is uci");
    assert!(best.to_move(&pos).is_ok(), "bestmove not legal in position: {mv}");
}

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[test]
fn uci_smoke_test_returns_legal_move() {
    let mut child = spawn_frontend(&[]);
    let mut stdin = child.stdin.take().unwrap();
    let mut reader = BufReader::new(child.stdout.take().unwrap());

    stdin
        .write_all(b"uci\nisready\nposition startpos moves e2e4\ngo movetime 50\n")
        .unwrap();
    let (output, bestmove_line) = read_until(&mut reader, "bestmove");

    stdin.write_all(b"quit\n").unwrap();
    let _ = child.wait();

    assert!(output.contains("id name material"));
    assert!(output.contains("uciok"));
    assert!(output.contains("readyok"));
    assert!(output.contains("info depth"));
    assert_legal(START_FEN, &["e2e4"], &bestmove_line.expect("no bestmove found"));
}

#[test]
fn uci_reports_options_and_handles_setoption() {
    let mut child = spawn_frontend(&["--debug"]);
    let input = b"uci\nsetoption name Hash value 999999\nsetoption name Hash value 256\nsetoption name Clear Hash\nsetoption name Missing value 1\nisready\nquit\n";
    child.stdin.as_mut().unwrap().write_all(input).unwrap();

    let output = child.wait_with_output().expect("failed to read output");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("option name Depth type spin default 32 min 1 max 64"));
    assert!(stdout.contains("option name Clear Hash type button"));
    assert!(stdout.contains("option name UCI_Chess960 type check default false"));
    assert!(stdout.contains("option name Hash type spin default 16 min 1 max 65536"));
    assert!(stdout.contains("info string Value 999999 is illegal"));
    assert!(!stdout.contains("info string Value 256 is illegal"));
    assert!(stdout.contains("info string Unknown option"));
    assert!(stdout.contains("readyok"));
}

#[test]
fn uci_go_depth_returns_legal_move() {
    let mut child = spawn_frontend(&[]);
    let mut stdin = child.stdin.take().unwrap();
    let mut reader = BufReader::new(child.stdout.take().unwrap());

    stdin
        .write_all(b"uci\nisready\nposition startpos\ngo depth 2\n")
        .unwrap();
    let (output, bestmove_line) = read_until(&mut reader, "bestmove");

    stdin.write_all(b"quit\n").unwrap();
    let _ = child.wait();

    assert!(output.contains("info depth 2"));
    assert_legal(START_FEN, &[], &bestmove_line.expect("no bestmove found"));
}

#[test]
fn uci_perft_command_outputs_nodes() {
    let mut child = spawn_frontend(&[]);
    let mut stdin = child.stdin.take().unwrap();
    let mut reader = BufReader::new(child.stdout.take().unwrap());

    stdin
        .write_all(b"uci\nisready\nposition startpos\nperft 2 threads 2\n")
        .unwrap();
    let (output, summary) = read_until(&mut reader, "perft 400 leaves");

    stdin.write_all(b"quit\n").unwrap();
    let _ = child.wait();

    assert!(output.contains("e2e4: 20"));
    assert!(
        summary.expect("perft output missing").contains("(using 2 thread(s))")
    );
}

#[test]
fn uci_stop_interrupts_search() {
    let mut child = spawn_frontend(&[]);
    let stdin = Arc::new(Mutex::new(child.stdin.take().unwrap()));
    let mut reader = BufReader::new(child.stdout.take().unwrap());

    stdin
        .lock()
        .unwrap()
        .write_all(b"uci\nisready\nposition startpos\ngo infinite\n")
        .unwrap();

    let stdin_clone = Arc::clone(&stdin);
    let stop_thread = thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        let _ = stdin_clone.lock().unwrap().write_all(b"stop\n");
    });

    let (_, bestmove_line) = read_until(&mut reader, "bestmove");

    let _ = stop_thread.join();
    stdin.lock().unwrap().write_all(b"quit\n").unwrap();
    let _ = child.wait();

    assert_legal(START_FEN, &[], &bestmove_line.expect("no bestmove found"));
}

#[test]
fn uci_go_mate_returns_legal_move() {
    let mut child = spawn_frontend(&[]);
    let mut stdin = child.stdin.take().unwrap();
    let mut reader = BufReader::new(child.stdout.take().unwrap());

    stdin
        .write_all(b"position fen 6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1\ngo mate 1\n")
        .unwrap();
    let (output, bestmove_line) = read_until(&mut reader, "bestmove");

    stdin.write_all(b"quit\n").unwrap();
    let _ = child.wait();

    assert!(output.contains("score mate 1"));
    assert_eq!(bestmove_line.as_deref().map(str::trim), Some("bestmove a1a8"));
}

#[test]
fn uci_engine_switch_clears_position() {
    let mut child = spawn_frontend(&["--debug"]);
    let input = b"position startpos\nengine\nengine random\nd\nengine chess\nisready\nquit\n";
    child.stdin.as_mut().unwrap().write_all(input).unwrap();

    let output = child.wait_with_output().expect("failed to read output");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(&lines[0..2], ["engine material", "engine random"]);
    assert!(lines.contains(&"info string position is cleared by engine change"));
    assert!(lines.contains(&"engine random ok"));
    assert!(lines.contains(&"info string No position defined"));
    assert!(lines.contains(&"info string engine chess is unknown"));
    assert_eq!(lines.last(), Some(&"readyok"));
}

#[test]
fn uci_end_of_input_ends_session() {
    let mut child = spawn_frontend(&["--engine", "random"]);
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(b"uci\nisready\n")
        .unwrap();
    let output = child.wait_with_output().expect("failed to read output");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.starts_with("id name random\n"));
    assert!(stdout.ends_with("readyok\n"));
}

#[test]
fn uci_unknown_engine_at_start_fails() {
    let child = spawn_frontend(&["--engine", "stockfish"]);
    let output = child.wait_with_output().expect("failed to read output");
    assert!(!output.status.success());
}
