use std::fmt::Write as _;
use std::io::{self, Write};

use form_spec::{
    AnswerError, FieldControl, RenderPayload, RenderStatus, Submission, render_json_ui,
    render_text,
};

/// Controls which bits of state the session prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: the current step only.
    Clean,
    /// Verbose output: status line and the visible field sequence.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum RenderMode {
    Text,
    Json,
}

/// Prints steps, input errors, and the final submission to `out`.
pub struct WizardPresenter<W: Write> {
    out: W,
    verbosity: Verbosity,
    mode: RenderMode,
    show_answers_json: bool,
}

impl<W: Write> WizardPresenter<W> {
    pub fn new(out: W, verbosity: Verbosity, mode: RenderMode, show_answers_json: bool) -> Self {
        Self {
            out,
            verbosity,
            mode,
            show_answers_json,
        }
    }

    pub fn show_step(&mut self, payload: &RenderPayload) -> io::Result<()> {
        match self.mode {
            RenderMode::Text => {
                writeln!(self.out, "{}", render_text(payload))?;
                self.show_commands(payload)?;
            }
            RenderMode::Json => {
                let ui = render_json_ui(payload);
                let pretty = serde_json::to_string_pretty(&ui).map_err(io::Error::other)?;
                writeln!(self.out, "{}", pretty)?;
            }
        }
        if self.verbosity.is_verbose() {
            self.show_status(payload)?;
        }
        Ok(())
    }

    /// Command hints for this terminal host.
    fn show_commands(&mut self, payload: &RenderPayload) -> io::Result<()> {
        if let Some(field) = &payload.current
            && matches!(field.control, FieldControl::MultiToggle { filterable: true })
        {
            writeln!(self.out, "Type '/text' to filter the options.")?;
        }
        if payload.status == RenderStatus::SubmitStep {
            writeln!(
                self.out,
                "Type ':submit' to {}.",
                payload.submit_label.to_lowercase()
            )?;
        }
        Ok(())
    }

    fn show_status(&mut self, payload: &RenderPayload) -> io::Result<()> {
        writeln!(
            self.out,
            "Status: {} ({}/{})",
            payload.status.as_str(),
            (payload.step + 1).min(payload.total),
            payload.total
        )?;
        writeln!(self.out, "Visible fields:")?;
        for field in &payload.visible {
            let mut entry = format!(" - {} ({})", field.name, field.label);
            if field.required {
                entry.push_str(" [required]");
            }
            let shown = field.value.to_string();
            if !shown.is_empty() {
                entry.push_str(" = ");
                entry.push_str(&shown);
            }
            writeln!(self.out, "{}", entry)?;
        }
        Ok(())
    }

    pub fn show_prompt(&mut self) -> io::Result<()> {
        write!(self.out, "> ")?;
        self.out.flush()
    }

    pub fn show_notice(&mut self, notice: &str) -> io::Result<()> {
        writeln!(self.out, "{}", notice)
    }

    pub fn show_input_error(&self, error: &AnswerError) {
        eprintln!("Invalid answer: {}", error);
    }

    pub fn show_filter(&mut self, payload: &RenderPayload, query: &str) -> io::Result<()> {
        let Some(field) = &payload.current else {
            return Ok(());
        };
        if field.options.is_empty() {
            return writeln!(self.out, "No option matches '{}'.", query);
        }
        writeln!(self.out, "Options matching '{}':", query)?;
        for (position, option) in field.options.iter().enumerate() {
            let marker = if option.selected { "[x]" } else { "[ ]" };
            writeln!(
                self.out,
                "  {} {}. {} ({})",
                marker,
                position + 1,
                option.label,
                option.value
            )?;
        }
        Ok(())
    }

    pub fn show_completion(&mut self, submission: &Submission) -> io::Result<()> {
        writeln!(self.out, "Done ✅")?;
        if !submission.report.missing_required.is_empty() {
            eprintln!(
                "Warning: required fields left empty: {}",
                submission.report.missing_required.join(", ")
            );
        }
        for error in &submission.report.errors {
            eprintln!(
                "Warning: {} - {}",
                error.field.as_deref().unwrap_or("<form>"),
                error.message
            );
        }
        match submission.answers.to_cbor() {
            Ok(bytes) => writeln!(self.out, "Answers (CBOR hex): {}", encode_hex(&bytes))?,
            Err(err) => eprintln!("Failed to serialize answers to CBOR: {}", err),
        }
        if self.show_answers_json {
            match submission.answers.to_json_pretty() {
                Ok(pretty) => writeln!(self.out, "{}", pretty)?,
                Err(err) => eprintln!("Failed to serialize answers to JSON: {}", err),
            }
        }
        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}
