use std::io::{self, Write};
use std::time::Duration;

use chrono::Local;
use telemed_core::{
    AnalysisResult, ApiHealth, AppViewModel, Notice, ResearchResult, Role, SlotKind,
    StagedImageView,
};

use super::commands::HELP;

/// Prints what changed between successive view models.
pub struct Renderer<W: Write> {
    out: W,
    notice_ttl: Duration,
    last: AppViewModel,
}

impl<W: Write> Renderer<W> {
    pub fn new(out: W, notice_ttl: Duration, initial: AppViewModel) -> Self {
        Self {
            out,
            notice_ttl,
            last: initial,
        }
    }

    pub fn render(&mut self, view: &AppViewModel) -> io::Result<()> {
        let last = std::mem::replace(&mut self.last, view.clone());

        if view.health != last.health {
            write_health(&mut self.out, &view.health)?;
        }

        if view.chat_language != last.chat_language {
            writeln!(self.out, "Chat language: {}", view.chat_language.code())?;
        }
        if view.research_count != last.research_count {
            writeln!(self.out, "Research results: {}", view.research_count)?;
        }

        let seen = if view.transcript.len() >= last.transcript.len() {
            last.transcript.len()
        } else {
            0
        };
        for turn in &view.transcript[seen..] {
            let who = match turn.role {
                Role::User => "you",
                Role::Assistant => "assistant",
            };
            writeln!(self.out, "{who}> {}", turn.content)?;
        }

        for kind in SlotKind::ALL {
            let now = view.is_loading(kind);
            if now != last.is_loading(kind) {
                let state = if now { "working..." } else { "done" };
                writeln!(self.out, "[{kind}] {state}")?;
            }
        }

        if view.staged_image != last.staged_image {
            if let Some(image) = &view.staged_image {
                self.staged_image(image, last.staged_image.as_ref())?;
            }
        }

        if view.analysis != last.analysis {
            if let Some(analysis) = &view.analysis {
                write_analysis(&mut self.out, analysis)?;
            }
        }
        if view.extracted_text != last.extracted_text {
            if let Some(text) = &view.extracted_text {
                writeln!(self.out, "Extracted text:\n{text}")?;
            }
        }
        if view.research != last.research {
            if let Some(research) = &view.research {
                write_research(&mut self.out, research)?;
            }
        }

        if view.error_notice != last.error_notice {
            self.notice("error", view.error_notice.as_ref())?;
        }
        if view.success_notice != last.success_notice {
            self.notice("ok", view.success_notice.as_ref())?;
        }

        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn health(&mut self, view: &AppViewModel) -> io::Result<()> {
        write_health(&mut self.out, &view.health)?;
        self.out.flush()
    }

    pub fn status(&mut self, view: &AppViewModel) -> io::Result<()> {
        write_health(&mut self.out, &view.health)?;
        for slot in &view.slots {
            let label = slot.kind.label();
            let state = if slot.loading { "loading" } else { "idle" };
            match slot.last_error {
                Some(reason) => writeln!(self.out, "{label:<16}{state} (last error: {reason})")?,
                None => writeln!(self.out, "{label:<16}{state}")?,
            }
        }
        self.out.flush()
    }

    pub fn help(&mut self) -> io::Result<()> {
        writeln!(self.out, "{HELP}")?;
        self.out.flush()
    }

    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn staged_image(
        &mut self,
        image: &StagedImageView,
        previous: Option<&StagedImageView>,
    ) -> io::Result<()> {
        let same_image = previous.is_some_and(|prev| prev.image_id == image.image_id);
        if !same_image {
            writeln!(
                self.out,
                "Image staged: {} ({}, {} bytes)",
                image.name, image.media_type, image.byte_len
            )?;
        }
        if let Some(uri) = &image.preview_data_uri {
            writeln!(self.out, "Preview ready ({} chars)", uri.len())?;
        }
        Ok(())
    }

    fn notice(&mut self, label: &str, notice: Option<&Notice>) -> io::Result<()> {
        let Some(notice) = notice else {
            return Ok(());
        };
        let ttl = chrono::Duration::from_std(self.notice_ttl)
            .unwrap_or_else(|_| chrono::Duration::zero());
        let clears_at = (Local::now() + ttl).format("%H:%M:%S");
        writeln!(self.out, "{label}: {} (until {clears_at})", notice.text)
    }
}

fn write_health(out: &mut impl Write, health: &ApiHealth) -> io::Result<()> {
    match health {
        ApiHealth::Unknown => writeln!(out, "API: checking..."),
        ApiHealth::Healthy => writeln!(out, "API: healthy"),
        ApiHealth::Unreachable { message } => writeln!(out, "API unavailable: {message}"),
    }
}

fn write_analysis(out: &mut impl Write, analysis: &AnalysisResult) -> io::Result<()> {
    writeln!(out, "Summary: {}", analysis.summary)?;
    write_list(out, "Key findings", &analysis.key_findings)?;
    write_list(out, "Recommendations", &analysis.recommendations)?;
    write_list(out, "Next steps", &analysis.next_steps)?;
    if let Some(disclaimer) = &analysis.disclaimer {
        writeln!(out, "Disclaimer: {disclaimer}")?;
    }
    Ok(())
}

fn write_list(out: &mut impl Write, heading: &str, items: &[String]) -> io::Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    writeln!(out, "{heading}:")?;
    for item in items {
        writeln!(out, "  - {item}")?;
    }
    Ok(())
}

fn write_research(out: &mut impl Write, research: &ResearchResult) -> io::Result<()> {
    writeln!(out, "Research summary: {}", research.summary)?;
    for (index, item) in research.results.iter().enumerate() {
        match item.relevance_score {
            Some(score) => writeln!(
                out,
                "{}. {} ({}% Relevant)",
                index + 1,
                item.title,
                (score * 100.0).round() as u32
            )?,
            None => writeln!(out, "{}. {}", index + 1, item.title)?,
        }
        writeln!(out, "   {}", item.excerpt)?;
        if let Some(url) = &item.url {
            writeln!(out, "   {url}")?;
        }
    }
    Ok(())
}
