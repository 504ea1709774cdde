use std::io::{self, BufRead, IsTerminal, Write};

/// Whether a person is there to answer a prompt.
pub fn interactive() -> bool {
    io::stdin().is_terminal()
}

/// Asks a yes/no question on the terminal. Anything but yes is a no.
pub fn confirm(prompt: &str) -> io::Result<bool> {
    confirm_with(prompt, io::stdin().lock(), io::stdout().lock())
}

fn confirm_with(prompt: &str, mut input: impl BufRead, mut output: impl Write) -> io::Result<bool> {
    let mut answer = String::new();
    loop {
        answer.clear();
        write!(output, "{prompt} (y/N): ")?;
        output.flush()?;

        // End of input.
        if input.read_line(&mut answer)? == 0 {
            return Ok(false);
        }
        match answer.trim().to_uppercase().as_str() {
            "Y" | "YES" => return Ok(true),
            "" | "N" | "NO" => return Ok(false),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("y\n", true)]
    #[case("Yes\n", true)]
    #[case("n\n", false)]
    #[case("\n", false)]
    #[case("", false)]
    #[case("maybe\ny\n", true)]
    fn test_confirm(#[case] typed: &str, #[case] expected: bool) {
        let mut output = Vec::new();
        let confirmed = confirm_with("Upload?", typed.as_bytes(), &mut output).unwrap();
        assert_eq!(confirmed, expected);
        assert!(String::from_utf8(output).unwrap().starts_with("Upload? (y/N): "));
    }
}
