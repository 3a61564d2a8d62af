//! Token scanner for free-text tax-rule descriptions.
//!
//! The classifier's pattern families operate over this token stream rather
//! than raw bytes. Amounts support thousand separators and `k`/`m`
//! magnitude suffixes; currency symbols are dropped. Scanning is
//! locale-independent: the same input text always yields the same tokens.

use rust_decimal::Decimal;

/// One lexed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A number, optionally suffixed `%`: `1,200`, `600k`, `1.5m`, `19%`.
    Number { value: Decimal, percent: bool },
    /// A lowercase alphabetic run.
    Word(String),
    Dash,
    LParen,
    RParen,
    Less,
    Greater,
}

impl Token {
    pub fn amount(&self) -> Option<Decimal> {
        match self {
            Token::Number {
                value,
                percent: false,
            } => Some(*value),
            _ => None,
        }
    }

    pub fn percent_value(&self) -> Option<Decimal> {
        match self {
            Token::Number {
                value,
                percent: true,
            } => Some(*value),
            _ => None,
        }
    }
}

/// Lexes lowercased rule text. Unrecognized punctuation (commas between
/// clauses, currency symbols, sentence periods) is skipped.
pub fn lex(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            let (token, next) = scan_number(&chars, i);
            tokens.push(token);
            i = next;
        } else if c.is_alphabetic() {
            let start = i;
            while i < chars.len() && chars[i].is_alphabetic() {
                i += 1;
            }
            tokens.push(Token::Word(chars[start..i].iter().collect()));
        } else {
            match c {
                '-' | '\u{2013}' | '\u{2014}' => tokens.push(Token::Dash),
                '(' => tokens.push(Token::LParen),
                ')' => tokens.push(Token::RParen),
                '<' => tokens.push(Token::Less),
                '>' => tokens.push(Token::Greater),
                _ => {}
            }
            i += 1;
        }
    }

    tokens
}

/// Scans one number starting at a digit: integer part with optional
/// `,DDD` thousand groups, optional fraction, optional `k`/`m` suffix,
/// optional `%`.
fn scan_number(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start;
    let mut digits = String::new();

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() {
            digits.push(c);
            i += 1;
        } else if c == ',' && is_thousand_group(chars, i) {
            digits.push(chars[i + 1]);
            digits.push(chars[i + 2]);
            digits.push(chars[i + 3]);
            i += 4;
        } else {
            break;
        }
    }

    if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        digits.push('.');
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            digits.push(chars[i]);
            i += 1;
        }
    }

    let mut multiplier = Decimal::ONE;
    if i < chars.len() {
        let suffix = chars[i].to_ascii_lowercase();
        let detached = i + 1 >= chars.len() || !chars[i + 1].is_alphanumeric();
        if detached && suffix == 'k' {
            multiplier = Decimal::from(1_000u32);
            i += 1;
        } else if detached && suffix == 'm' {
            multiplier = Decimal::from(1_000_000u32);
            i += 1;
        }
    }

    let mut percent = false;
    if i < chars.len() && chars[i] == '%' {
        percent = true;
        i += 1;
    }

    let value = digits.parse::<Decimal>().unwrap_or(Decimal::ZERO) * multiplier;
    (Token::Number { value, percent }, i)
}

/// `,` starting a `,DDD` group that does not run into a fourth digit.
fn is_thousand_group(chars: &[char], comma: usize) -> bool {
    let group_digits = comma + 3 < chars.len()
        && chars[comma + 1].is_ascii_digit()
        && chars[comma + 2].is_ascii_digit()
        && chars[comma + 3].is_ascii_digit();
    let terminated = comma + 4 >= chars.len() || !chars[comma + 4].is_ascii_digit();
    group_digits && terminated
}
