use hansard_common::Frame;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CrawlStats {
    pub days_processed: u32,
    pub days_empty: u32,
    pub days_skipped: u32,
    pub days_failed: u32,
    pub debates_fetched: u32,
    pub debates_filtered: u32,
    pub debates_absent: u32,
    pub debates_failed: u32,
    pub speeches_walked: u32,
    pub candidates: u32,
    pub duplicates: u32,
    pub records_written: u32,
    pub by_frame: [u32; 5], // LabourNeed, LabourThreat, Racialised, Mixed, Other
    pub high_confidence: u32,
}

impl CrawlStats {
    pub fn count_frame(&mut self, frame: Frame) {
        let slot = Frame::ALL.iter().position(|f| *f == frame).unwrap_or(4);
        self.by_frame[slot] += 1;
    }

    pub fn frame_count(&self, frame: Frame) -> u32 {
        Frame::ALL
            .iter()
            .position(|f| *f == frame)
            .map_or(0, |slot| self.by_frame[slot])
    }
}

impl std::fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Crawl Complete ===")?;
        writeln!(f, "Days processed:     {}", self.days_processed)?;
        writeln!(f, "Days empty:         {}", self.days_empty)?;
        writeln!(f, "Days skipped:       {} (weekend)", self.days_skipped)?;
        writeln!(f, "Days failed:        {}", self.days_failed)?;
        writeln!(f, "Debates fetched:    {}", self.debates_fetched)?;
        writeln!(f, "Debates filtered:   {} (title)", self.debates_filtered)?;
        writeln!(f, "Debates absent:     {}", self.debates_absent)?;
        writeln!(f, "Debates failed:     {}", self.debates_failed)?;
        writeln!(f, "Speeches walked:    {}", self.speeches_walked)?;
        writeln!(f, "Candidates:         {}", self.candidates)?;
        writeln!(f, "Duplicates:         {}", self.duplicates)?;
        writeln!(f, "Records written:    {}", self.records_written)?;
        writeln!(f, "\nBy frame:")?;
        for (frame, count) in Frame::ALL.iter().zip(self.by_frame) {
            writeln!(f, "  {:<14} {}", frame.as_str(), count)?;
        }
        let total = self.records_written.max(1);
        writeln!(
            f,
            "\nHigh confidence:    {} ({:.0}%)",
            self.high_confidence,
            self.high_confidence as f64 / total as f64 * 100.0
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_slots_follow_frame_order() {
        let mut stats = CrawlStats::default();
        stats.count_frame(Frame::Mixed);
        stats.count_frame(Frame::Mixed);
        stats.count_frame(Frame::LabourNeed);
        assert_eq!(stats.by_frame, [1, 0, 0, 2, 0]);
        assert_eq!(stats.frame_count(Frame::Mixed), 2);
        assert!(stats.to_string().contains("MIXED"));
    }
}
