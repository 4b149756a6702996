//! Internal module for validating JSON numbers

/// Returns whether `number` is a valid JSON number, for example `-12.5e+3`
///
/// The tokenizer consumes every char which may be part of a number and then uses
/// this function to reject malformed runs such as `01`, `1.`, `--1` or `1e`.
pub(crate) fn is_valid_json_number(number: &str) -> bool {
    #[derive(PartialEq)]
    enum State {
        Start,
        Minus,
        IntZero,
        IntNonZero,
        DecimalPoint,
        DecimalDigit,
        ExpE,
        ExpSign,
        ExpDigit,
    }

    let mut state = State::Start;

    for byte in number.bytes() {
        state = match byte {
            b'-' => match state {
                State::Start => State::Minus,
                State::ExpE => State::ExpSign,
                _ => return false,
            },
            b'+' => match state {
                State::ExpE => State::ExpSign,
                _ => return false,
            },
            b'0' => match state {
                State::Start | State::Minus => State::IntZero,
                State::IntNonZero => State::IntNonZero,
                State::DecimalPoint | State::DecimalDigit => State::DecimalDigit,
                State::ExpE | State::ExpSign | State::ExpDigit => State::ExpDigit,
                // Leading 0 is not allowed, e.g. `01`
                State::IntZero => return false,
            },
            b'1'..=b'9' => match state {
                State::Start | State::Minus | State::IntNonZero => State::IntNonZero,
                State::DecimalPoint | State::DecimalDigit => State::DecimalDigit,
                State::ExpE | State::ExpSign | State::ExpDigit => State::ExpDigit,
                State::IntZero => return false,
            },
            b'.' => match state {
                State::IntZero | State::IntNonZero => State::DecimalPoint,
                _ => return false,
            },
            b'e' | b'E' => match state {
                State::IntZero | State::IntNonZero | State::DecimalDigit => State::ExpE,
                _ => return false,
            },
            _ => return false,
        };
    }

    matches!(
        state,
        State::IntZero | State::IntNonZero | State::DecimalDigit | State::ExpDigit
    )
}
