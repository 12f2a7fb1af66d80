//! Account credentials for the Copernicus Marine data service.

use std::{
    fmt,
    io::{self, BufRead, Write},
};

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Supplies credentials once per run.
pub trait CredentialProvider {
    fn credentials(&mut self) -> io::Result<Credentials>;
}

impl CredentialProvider for Credentials {
    fn credentials(&mut self) -> io::Result<Credentials> {
        Ok(self.clone())
    }
}

const USERNAME_PROMPT: &str = "Enter your username: ";
const PASSWORD_PROMPT: &str = "Enter your password: ";

/// Asks for whichever of username and password was not given up front.
pub struct PromptCredentials<R, W> {
    username: Option<String>,
    password: Option<String>,
    input: R,
    output: W,
    /// Read the password from the controlling terminal with echo turned off.
    hide_password: bool,
}

impl PromptCredentials<io::StdinLock<'static>, io::Stderr> {
    pub fn terminal(username: Option<String>, password: Option<String>) -> Self {
        PromptCredentials {
            hide_password: true,
            ..PromptCredentials::new(username, password, io::stdin().lock(), io::stderr())
        }
    }
}

impl<R: BufRead, W: Write> PromptCredentials<R, W> {
    pub fn new(username: Option<String>, password: Option<String>, input: R, output: W) -> Self {
        PromptCredentials {
            username,
            password,
            input,
            output,
            hide_password: false,
        }
    }

    fn ask_password(&mut self) -> io::Result<String> {
        if self.hide_password {
            return rpassword::prompt_password(PASSWORD_PROMPT);
        }

        write!(self.output, "{}", PASSWORD_PROMPT)?;
        self.output.flush()?;
        rpassword::read_password_from_bufread(&mut self.input)
    }

    fn ask(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no input while reading credentials",
            ));
        }

        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl<R: BufRead, W: Write> CredentialProvider for PromptCredentials<R, W> {
    fn credentials(&mut self) -> io::Result<Credentials> {
        let username = match self.username.take() {
            Some(username) => username,
            None => self.ask(USERNAME_PROMPT)?,
        };
        let password = match self.password.take() {
            Some(password) => password,
            None => self.ask_password()?,
        };

        Ok(Credentials::new(username, password))
    }
}

// -- Tests -------------------------------------------------------------------
