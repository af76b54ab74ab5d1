//! Start line and header block scanners.
//!
//! Both are forward-only byte state machines. A line ends at CRLF, a bare
//! LF or a bare CR; a line end followed by SP or HTAB folds the current
//! header value onto the next line. The first empty line ends the header
//! block and everything after it is the body.

use std::ops::Range;

use bytes::Bytes;

use crate::error::{ParseError, Result};
use crate::message::{RawMessage, RequestLine, StartLine, StatusLine};
use crate::parser::is_token_char;
use crate::parser::uri::parse_uri;
use crate::span::Span;
use crate::types::{Header, HeaderKind, Method};

const SIP_VERSION: &[u8] = b"SIP/2.0";

fn is_line_end(c: u8) -> bool {
    c == b'\r' || c == b'\n'
}

fn is_wsp(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

/// Returns the index just past the line end starting at `i`
fn skip_line_end(buf: &[u8], i: usize) -> usize {
    if buf[i] == b'\r' && buf.get(i + 1) == Some(&b'\n') {
        i + 2
    } else {
        i + 1
    }
}

/// Matches "SIP/2.0" at `i`, "SIP" case-insensitively
fn version_at(buf: &[u8], i: usize) -> Result<usize> {
    let end = i + SIP_VERSION.len();
    if buf.len() < end {
        let rest = &buf[i..];
        return if SIP_VERSION[..rest.len()].eq_ignore_ascii_case(rest) {
            Err(ParseError::UnexpectedEndOfInput)
        } else {
            Err(ParseError::MalformedStartLine)
        };
    }
    if buf[i..i + 4].eq_ignore_ascii_case(b"SIP/") && &buf[i + 4..end] == b"2.0" {
        Ok(end)
    } else {
        Err(ParseError::MalformedStartLine)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fl {
    Method,
    Ruri,
    Eol,
    VersionSp,
    Status(u8),
    StatusSp,
    Reason,
}

/// Scans the start line; returns it with the offset of the first header line
fn scan_start_line(root: &Span) -> Result<(StartLine, usize)> {
    let buf = root.as_bytes();

    let is_reply = buf.len() >= 4 && buf[..4].eq_ignore_ascii_case(b"SIP/");
    let (mut state, mut i) = if is_reply {
        (Fl::VersionSp, version_at(buf, 0)?)
    } else {
        (Fl::Method, 0)
    };

    let mut begin = 0;
    let mut method = None;
    let mut uri = None;
    let mut code: u16 = 0;

    while i < buf.len() {
        let c = buf[i];
        match state {
            Fl::Method => match c {
                b' ' => {
                    let token = &buf[begin..i];
                    let parsed =
                        Method::from_token(token).map_err(|_| ParseError::MalformedStartLine)?;
                    method = Some((parsed, root.slice(begin..i)));
                    state = Fl::Ruri;
                    begin = i + 1;
                }
                c if is_line_end(c) || c == b'\t' => return Err(ParseError::MalformedStartLine),
                _ => {}
            },
            Fl::Ruri => match c {
                b' ' => {
                    let parsed = parse_uri(&root.slice(begin..i))
                        .map_err(|_| ParseError::MalformedStartLine)?;
                    uri = Some(parsed);
                    i = version_at(buf, i + 1)?;
                    state = Fl::Eol;
                    continue;
                }
                c if is_line_end(c) || c == b'\t' => return Err(ParseError::MalformedStartLine),
                _ => {}
            },
            Fl::Eol => {
                if !is_line_end(c) {
                    return Err(ParseError::MalformedStartLine);
                }
                let (method, method_str) = method.ok_or(ParseError::MalformedStartLine)?;
                let uri = uri.ok_or(ParseError::MalformedStartLine)?;
                return Ok((
                    StartLine::Request(RequestLine {
                        method,
                        method_str,
                        uri,
                    }),
                    skip_line_end(buf, i),
                ));
            }
            Fl::VersionSp => {
                if c != b' ' {
                    return Err(ParseError::MalformedStartLine);
                }
                state = Fl::Status(0);
            }
            Fl::Status(n) => {
                if !c.is_ascii_digit() {
                    return Err(ParseError::MalformedStartLine);
                }
                code = code * 10 + u16::from(c - b'0');
                state = if n == 2 { Fl::StatusSp } else { Fl::Status(n + 1) };
            }
            Fl::StatusSp => {
                if !(100..=699).contains(&code) {
                    return Err(ParseError::MalformedStartLine);
                }
                if is_line_end(c) {
                    return Ok((
                        StartLine::Reply(StatusLine {
                            code,
                            reason: Span::default(),
                        }),
                        skip_line_end(buf, i),
                    ));
                }
                if c != b' ' {
                    return Err(ParseError::MalformedStartLine);
                }
                state = Fl::Reason;
                begin = i + 1;
            }
            Fl::Reason => {
                if is_line_end(c) {
                    return Ok((
                        StartLine::Reply(StatusLine {
                            code,
                            reason: root.slice(begin..i),
                        }),
                        skip_line_end(buf, i),
                    ));
                }
            }
        }
        i += 1;
    }

    Err(ParseError::UnexpectedEndOfInput)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum H {
    Name,
    HColon,
    ValueSws,
    Value,
}

/// Trims trailing linear whitespace off a value range
fn trim_end(buf: &[u8], range: Range<usize>) -> Range<usize> {
    let mut end = range.end;
    while end > range.start && crate::span::is_lws(buf[end - 1]) {
        end -= 1;
    }
    range.start..end
}

/// Scans the header block starting at `pos`; returns the headers and the
/// offset of the body
fn scan_headers(root: &Span, pos: usize) -> Result<(Vec<Header>, usize)> {
    let buf = root.as_bytes();
    let mut headers = Vec::new();

    let mut state = H::Name;
    let mut begin = pos;
    let mut name = pos..pos;
    let mut i = pos;

    let push = |name: &Range<usize>, value: Range<usize>, headers: &mut Vec<Header>| {
        let value = trim_end(buf, value);
        headers.push(Header {
            kind: HeaderKind::from_name(&buf[name.clone()]),
            name: root.slice(name.clone()),
            value: root.slice(value),
        });
    };

    while i < buf.len() {
        let c = buf[i];
        match state {
            H::Name => match c {
                b':' | b' ' | b'\t' => {
                    if i == begin {
                        return Err(ParseError::header("header", "empty header name"));
                    }
                    name = begin..i;
                    state = if c == b':' { H::ValueSws } else { H::HColon };
                }
                c if is_line_end(c) => {
                    if i == begin {
                        return Ok((headers, skip_line_end(buf, i)));
                    }
                    return Err(ParseError::header("header", "line end in header name"));
                }
                _ => {}
            },
            H::HColon => match c {
                b':' => state = H::ValueSws,
                c if is_wsp(c) => {}
                _ => return Err(ParseError::header("header", "missing ':' after header name")),
            },
            H::ValueSws => match c {
                c if is_wsp(c) => {}
                c if is_line_end(c) => {
                    let next = skip_line_end(buf, i);
                    if buf.get(next).is_some_and(|n| is_wsp(*n)) {
                        i = next;
                        continue;
                    }
                    push(&name, i..i, &mut headers);
                    begin = next;
                    state = H::Name;
                    i = next;
                    continue;
                }
                _ => {
                    begin = i;
                    state = H::Value;
                }
            },
            H::Value => {
                if is_line_end(c) {
                    let next = skip_line_end(buf, i);
                    if buf.get(next).is_some_and(|n| is_wsp(*n)) {
                        i = next;
                        continue;
                    }
                    push(&name, begin..i, &mut headers);
                    begin = next;
                    state = H::Name;
                    i = next;
                    continue;
                }
            }
        }
        i += 1;
    }

    match state {
        H::Name if begin == buf.len() => Ok((headers, buf.len())),
        H::Value => {
            push(&name, begin..buf.len(), &mut headers);
            Ok((headers, buf.len()))
        }
        _ => Err(ParseError::UnexpectedEndOfInput),
    }
}

/// Splits a buffer into start line, headers and body without interpreting
/// any header value
pub fn scan(buf: Bytes) -> Result<RawMessage> {
    let root = Span::from(buf.clone());
    let (start, headers_at) = scan_start_line(&root)?;
    let (headers, body_at) = scan_headers(&root, headers_at)?;

    // values stay opaque octets; only names are interpreted here
    if let Some(bad) = headers
        .iter()
        .find(|h| !h.name.as_bytes().iter().all(|&c| is_token_char(c)))
    {
        return Err(ParseError::header(
            "header",
            format!("invalid header name {:?}", bad.name),
        ));
    }

    Ok(RawMessage {
        body: buf.slice(body_at..),
        buf,
        start,
        headers,
    })
}
