use std::path::PathBuf;

use crate::command::{Pipeline, Stage};
use crate::redirection::Redirect;

const SEPARATORS: [char; 2] = [' ', '\t'];
const PIPE: &str = "|";
const BACKGROUND: &str = "&";

/// Splits a line into pipeline stages. Never fails: anything that is not
/// an operator ends up as an argument.
pub fn parse(line: &str) -> Pipeline {
    let line = line.trim_matches(SEPARATORS);

    let autocomplete = line.ends_with('?');
    let background = line.ends_with('&');

    let mut tokens: Vec<&str> = line
        .split(SEPARATORS)
        .filter(|token| !token.is_empty())
        .collect();

    // `sleep 5&` carries the marker on its last word.
    if background {
        if let Some(last) = tokens.last_mut() {
            if *last != BACKGROUND {
                *last = last.trim_end_matches('&');
            }
        }
    }

    let stages = tokens
        .split(|token| *token == PIPE)
        .map(|tokens| parse_stage(tokens, background, autocomplete))
        .collect();

    return Pipeline::new(stages);
}

fn parse_stage(tokens: &[&str], background: bool, autocomplete: bool) -> Stage {
    let mut stage = Stage {
        background,
        autocomplete,
        ..Stage::default()
    };

    let Some((name, rest)) = tokens.split_first() else {
        return stage;
    };
    stage.name = name.to_string();

    let mut rest = rest.iter().copied();
    while let Some(token) = rest.next() {
        if token == BACKGROUND {
            continue;
        }

        if let Some(target) = token.strip_prefix(">>") {
            stage.stdout = Redirect::ToFileAppend(redirect_target(target, &mut rest));
        } else if let Some(target) = token.strip_prefix('>') {
            stage.stdout = Redirect::ToFileTruncate(redirect_target(target, &mut rest));
        } else if let Some(target) = token.strip_prefix('<') {
            stage.stdin = Redirect::FromFile(redirect_target(target, &mut rest));
        } else {
            stage.args.push(unquote(token).to_string());
        }
    }

    return stage;
}

/// `>out` names its target inline; `> out` takes the following word.
fn redirect_target<'a>(inline: &'a str, rest: &mut impl Iterator<Item = &'a str>) -> PathBuf {
    if !inline.is_empty() {
        return PathBuf::from(inline);
    }

    return rest.next().map(PathBuf::from).unwrap_or_default();
}

/// Strips one pair of matching quotes around a whole word. Quotes inside a
/// word and words split by whitespace inside quotes stay as typed; there are
/// no escape sequences.
fn unquote(token: &str) -> &str {
    let bytes = token.as_bytes();
    let quoted = bytes.len() > 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[0] == bytes[bytes.len() - 1];

    if quoted {
        return &token[1..token.len() - 1];
    }

    return token;
}
