#![allow(unused_imports)]

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ask_term::{
    decode_key, first_line, install_interrupt_flag, is_terminal, read_key, read_line, strip_ansi,
    truncate_to_width, visible_width, InterruptGuard, Key, LineInput, LiveLine, Palette,
    RawModeGuard, STDERR_FD, STDIN_FD, STDOUT_FD,
};

#[test]
fn public_api_exports_compile() {}

#[test]
fn styled_text_measures_like_plain_text() {
    let palette = Palette::new(true);
    let styled = palette.bold(&palette.red("✗ bash error"));
    assert_ne!(styled, "✗ bash error");
    assert_eq!(strip_ansi(&styled), "✗ bash error");
    assert_eq!(visible_width(&styled), visible_width("✗ bash error"));

    let plain = Palette::plain();
    assert_eq!(plain.red("x"), "x");
    assert!(!plain.enabled());
}

#[test]
fn truncation_respects_wide_graphemes_and_styles() {
    assert_eq!(truncate_to_width("abcdef", 4, "…"), "abc…");
    assert_eq!(truncate_to_width("abc", 4, "…"), "abc");
    assert_eq!(truncate_to_width("日本語テキスト", 5, "…"), "日本…");

    let styled = Palette::new(true).cyan("abcdefgh");
    let cut = truncate_to_width(&styled, 5, "…");
    assert!(cut.ends_with("\x1b[0m…"));
    assert_eq!(strip_ansi(&cut), "abcd…");
    assert_eq!(visible_width(&cut), 5);
}

#[test]
fn first_line_drops_the_rest() {
    assert_eq!(first_line("git commit -m 'fix'\nmore", 60), "git commit -m 'fix'");
    assert_eq!(first_line("", 10), "");
}

#[test]
fn approval_keys_decode_from_raw_bytes() {
    assert_eq!(decode_key(b"y"), Key::Char('y'));
    assert_eq!(decode_key(b"\r"), Key::Enter);
    assert_eq!(decode_key(&[0x1b]), Key::Escape);
    assert_eq!(decode_key(&[0x03]), Key::Interrupt);
    assert_eq!(decode_key(b"\x1b[A"), Key::Other);
    assert_eq!(decode_key(b"yes"), Key::Other);
}

#[test]
fn live_line_only_rewrites_its_own_pending_line() {
    let mut out = Vec::new();
    let mut live = LiveLine::new(true);
    live.write_pending(&mut out, "c1", "› ls").expect("pending");
    live.write_pending(&mut out, "c2", "› read").expect("pending");
    let rewrote_c1 = live.write_final(&mut out, "c1", "› ls › done").expect("final");
    assert!(!rewrote_c1);

    live.write_pending(&mut out, "c3", "› tree").expect("pending");
    let rewrote_c3 = live.write_final(&mut out, "c3", "› tree › done").expect("final");
    assert!(rewrote_c3);
    assert_eq!(live.pending_key(), None);

    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(
        text,
        "› ls\n› read\n› ls › done\n› tree\n\x1b[1A\x1b[2K\r› tree › done\n"
    );
}

#[test]
fn interrupt_flag_installs_and_releases() {
    let flag = Arc::new(AtomicBool::new(false));
    let guard = install_interrupt_flag(Arc::clone(&flag)).expect("install");
    drop(guard);
}
