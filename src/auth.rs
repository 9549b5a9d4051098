use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

pub const SECRET_ENV: &str = "KEYSEAL_SECRET";

/// Reads the derivation secret: environment, then piped stdin, then a
/// TTY prompt.
pub fn read_secret() -> Result<Zeroizing<String>> {
    //  KEYSEAL_SECRET="supersecret" keyseal derive --salt s@lt-value --out key.jwk
    if let Ok(secret) = std::env::var(SECRET_ENV) {
        if !secret.is_empty() {
            return Ok(Zeroizing::new(secret));
        }
    }

    //  echo "supersecret" | keyseal derive ...
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().lock().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
    }

    if io::stdin().is_terminal() {
        let secret = Zeroizing::new(rpassword::prompt_password("Secret: ")?);
        if !secret.is_empty() {
            return Ok(secret);
        }
    }

    bail!("no secret provided")
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
