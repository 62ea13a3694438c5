//! The `/calc` arithmetic evaluator.
//!
//! The body is not parsed as JSON. A literal scan looks for the shape
//! `..."value":"<num><op><num>"...`: the first `:` opens the field, the next
//! `"` opens the expression, digits accumulate into the left operand until an
//! operator, then into the right operand until the closing `"`.
//!
//! Operands are `i64` and accumulate with wrapping arithmetic, so very long
//! digit runs wrap silently instead of failing.

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Start,
    AfterColon,
    FirstNumber,
    SecondNumber,
    Done,
}

/// Evaluates the expression embedded in a `/calc` body.
///
/// If the closing quote is never reached the result is `0 + 0`. Division by
/// zero yields `0`.
///
/// # Examples
/// ```
/// use prefork_web::site::calc::evaluate;
///
/// assert_eq!(evaluate(br#"{"value":"12+30"}"#), 42);
/// assert_eq!(evaluate(br#"{"value":"7/0"}"#), 0);
/// ```
pub fn evaluate(body: &[u8]) -> i64 {
    let mut state = State::Start;
    let (mut lhs, mut rhs, mut op) = (0i64, 0i64, b'+');

    for &byte in body {
        match (state, byte) {
            (State::Start, b':') => state = State::AfterColon,
            (State::AfterColon, b'"') => state = State::FirstNumber,
            (State::FirstNumber, b'0'..=b'9') => lhs = push_digit(lhs, byte),
            (State::FirstNumber, b'+' | b'-' | b'*' | b'/') => {
                op = byte;
                state = State::SecondNumber;
            }
            (State::SecondNumber, b'0'..=b'9') => rhs = push_digit(rhs, byte),
            (State::SecondNumber, b'"') => {
                state = State::Done;
                break;
            }
            _ => {}
        }
    }

    if state != State::Done {
        return 0;
    }

    match op {
        b'-' => lhs.wrapping_sub(rhs),
        b'*' => lhs.wrapping_mul(rhs),
        b'/' if rhs == 0 => 0,
        b'/' => lhs.wrapping_div(rhs),
        _ => lhs.wrapping_add(rhs),
    }
}

#[inline(always)]
fn push_digit(acc: i64, digit: u8) -> i64 {
    acc.wrapping_mul(10).wrapping_add((digit - b'0') as i64)
}
