use crate::record::VersionRecord;
use chrono::NaiveDate;

/// Pick the records to delete for one package.
///
/// Records are sorted newest first, the first `keep` are retained no matter
/// their age, and of the rest only those dated strictly before `older_than`
/// are returned. The result keeps the newest-first order.
pub fn select_for_removal(
    keep: usize,
    older_than: NaiveDate,
    mut records: Vec<VersionRecord>,
) -> Vec<VersionRecord> {
    records.sort_unstable_by(|a, b| b.cmp(a));

    records
        .into_iter()
        .skip(keep)
        .filter(|record| record.effective_date < older_than)
        .collect()
}
