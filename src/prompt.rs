use std::io::{self, BufRead, Write};

/// Pick the trimmed answer, or `default` when the answer is empty.
pub fn answer_or_default(answer: &str, default: Option<&str>) -> Option<String> {
    let answer = answer.trim();
    if !answer.is_empty() {
        return Some(answer.to_string());
    }
    default.map(str::to_string)
}

fn read_answer(
    input: &mut impl BufRead,
    output: &mut impl Write,
    question: &str,
) -> io::Result<String> {
    write!(output, "{question}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"));
    }
    Ok(line)
}

/// Ask `label`, showing `default` and accepting it on empty input. Without a
/// default, asks again until something is entered.
pub fn ask_with_default(
    input: &mut impl BufRead,
    output: &mut impl Write,
    label: &str,
    default: Option<&str>,
) -> io::Result<String> {
    let question = match default {
        Some(d) => format!("{label} (default: {d}): "),
        None => format!("{label}: "),
    };
    loop {
        let line = read_answer(input, output, &question)?;
        if let Some(answer) = answer_or_default(&line, default) {
            return Ok(answer);
        }
    }
}

/// Ask on the terminal without echoing the answer.
pub fn ask_secret(label: &str) -> io::Result<String> {
    rpassword::prompt_password(format!("{label}: "))
}
