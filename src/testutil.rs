/*
 *
 *  *
 *  *      Copyright (c) 2018-2025, SnackCloud All rights reserved.
 *  *
 *  *   Redistribution and use in source and binary forms, with or without
 *  *   modification, are permitted provided that the following conditions are met:
 *  *
 *  *   Redistributions of source code must retain the above copyright notice,
 *  *   this list of conditions and the following disclaimer.
 *  *   Redistributions in binary form must reproduce the above copyright
 *  *   notice, this list of conditions and the following disclaimer in the
 *  *   documentation and/or other materials provided with the distribution.
 *  *   Neither the name of the www.snackcloud.cn developer nor the names of its
 *  *   contributors may be used to endorse or promote products derived from
 *  *   this software without specific prior written permission.
 *  *   Author: SnackCloud
 *  *
 *
 */
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread;

/// Minimal RESP endpoint on an ephemeral loopback port: accepts connections
/// and answers every command with `+PONG`. Enough for the dial and borrow
/// flows, which only ever issue PING.
pub(crate) fn spawn_fake_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    thread::spawn(move || {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    thread::spawn(move || serve(stream));
                }
                Err(_) => break,
            }
        }
    });

    addr
}

fn serve(mut stream: TcpStream) {
    let mut pending = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                pending.extend_from_slice(&buf[..n]);
                // a single read may carry several pipelined commands (the
                // client sends CLIENT SETINFO twice on connect); answer each
                // one, or the client hangs waiting for the missing replies
                while let Some(consumed) = parse_command(&pending) {
                    pending.drain(..consumed);
                    if stream.write_all(b"+PONG\r\n").is_err() {
                        return;
                    }
                }
            }
        }
    }
}

/// Length of one complete RESP command at the front of `buf`, or `None` if
/// the buffer does not yet hold a full command.
fn parse_command(buf: &[u8]) -> Option<usize> {
    if buf.is_empty() {
        return None;
    }
    if buf[0] != b'*' {
        // inline command: a single CRLF-terminated line
        return Some(find_crlf(buf, 0)? + 2);
    }
    let (argc, mut pos) = parse_int_line(buf, 1)?;
    for _ in 0..argc {
        if *buf.get(pos)? != b'$' {
            return None;
        }
        let (len, body) = parse_int_line(buf, pos + 1)?;
        pos = body + len as usize + 2;
        if pos > buf.len() {
            return None;
        }
    }
    Some(pos)
}

/// Parses the integer line starting at `start`, returning the value and the
/// offset just past its CRLF.
fn parse_int_line(buf: &[u8], start: usize) -> Option<(u64, usize)> {
    let end = find_crlf(buf, start)?;
    let value = std::str::from_utf8(&buf[start..end]).ok()?.parse().ok()?;
    Some((value, end + 2))
}

fn find_crlf(buf: &[u8], start: usize) -> Option<usize> {
    buf[start..]
        .windows(2)
        .position(|w| w == b"\r\n")
        .map(|p| start + p)
}
