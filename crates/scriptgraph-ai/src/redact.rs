//! Redaction for text leaving the machine (prompts, logged snippets)

use regex::Regex;

pub struct Redactor {
    redact_paths: bool,
    redact_ips: bool,
    redact_emails: bool,
    ip: Regex,
    email: Regex,
    path: Regex,
}

impl Redactor {
    pub fn new(redact_paths: bool, redact_ips: bool, redact_emails: bool) -> Self {
        Self {
            redact_paths,
            redact_ips,
            redact_emails,
            ip: Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap(),
            email: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap(),
            // absolute paths only; bundle-relative paths are the payload
            path: Regex::new(r"([A-Za-z]:\\\S+|/\S+)").unwrap(),
        }
    }

    pub fn redact(&self, s: &str) -> String {
        let mut out = s.to_string();
        if self.redact_ips {
            out = self.ip.replace_all(&out, "<IP>").into_owned();
        }
        if self.redact_emails {
            out = self.email.replace_all(&out, "<EMAIL>").into_owned();
        }
        if self.redact_paths {
            out = self.path.replace_all(&out, "<PATH>").into_owned();
        }
        out
    }
}

impl Default for Redactor {
    fn default() -> Self {
        Self::new(true, true, true)
    }
}
