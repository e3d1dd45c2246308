use chrono::NaiveDate;

/// Inclusive range of days from the participant's resume date up to the
/// target date. Empty when the resume date is already past the target.
#[derive(Debug, Clone)]
pub struct SyncWindow {
    next: Option<NaiveDate>,
    target: NaiveDate,
}

impl SyncWindow {
    pub fn new(resume: NaiveDate, target: NaiveDate) -> Self {
        SyncWindow {
            next: (resume <= target).then_some(resume),
            target,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_none()
    }

    pub fn days(&self) -> u64 {
        match self.next {
            Some(next) => (self.target - next).num_days() as u64 + 1,
            None => 0,
        }
    }
}

impl Iterator for SyncWindow {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current
            .succ_opt()
            .filter(|candidate| *candidate <= self.target);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 9, d).unwrap()
    }

    #[test]
    fn walks_every_day_inclusive_of_both_ends() {
        let window = SyncWindow::new(day(1), day(4));
        assert_eq!(window.days(), 4);
        let collected: Vec<NaiveDate> = window.collect();
        assert_eq!(collected, vec![day(1), day(2), day(3), day(4)]);
    }

    #[test]
    fn single_day_window_yields_that_day() {
        let collected: Vec<NaiveDate> = SyncWindow::new(day(2), day(2)).collect();
        assert_eq!(collected, vec![day(2)]);
    }

    #[test]
    fn resume_past_target_is_empty() {
        let mut window = SyncWindow::new(day(5), day(2));
        assert!(window.is_empty());
        assert_eq!(window.days(), 0);
        assert_eq!(window.next(), None);
    }

    #[test]
    fn crosses_month_boundaries() {
        let from = NaiveDate::from_ymd_opt(2025, 8, 30).unwrap();
        let to = day(2);
        let collected: Vec<NaiveDate> = SyncWindow::new(from, to).collect();
        assert_eq!(collected.len(), 4);
        assert_eq!(collected[2], day(1));
    }
}
