//! Seeded orderings and power filtering for admission experiments

use crate::reasoning::{Case, CaseBase, CaseRecord};

/// `repeats` independent shuffles of `records`, reproducible from `seed`
pub fn shuffle_records(records: &[CaseRecord], repeats: usize, seed: u64) -> Vec<Vec<CaseRecord>> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..repeats)
        .map(|_| {
            let mut sample = records.to_vec();
            rng.shuffle(&mut sample);
            sample
        })
        .collect()
}

/// `repeats` samples alternating pi and delta decisions.
///
/// Each sample holds as many records as the smaller decision class: half
/// from each class, interleaved starting with pi, with one extra pi record
/// at the end when that count is odd.
pub fn balanced_shuffle_records(
    records: &[CaseRecord],
    repeats: usize,
    seed: u64,
) -> Vec<Vec<CaseRecord>> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let (mut pi, mut delta): (Vec<CaseRecord>, Vec<CaseRecord>) = records
        .iter()
        .filter(|r| r.decision == "pi" || r.decision == "delta")
        .cloned()
        .partition(|r| r.decision == "pi");

    let min_len = pi.len().min(delta.len());
    let pairs = min_len / 2;

    (0..repeats)
        .map(|_| {
            rng.shuffle(&mut pi);
            rng.shuffle(&mut delta);

            let mut sample = Vec::with_capacity(min_len);
            for i in 0..pairs {
                sample.push(pi[i].clone());
                sample.push(delta[i].clone());
            }
            if min_len % 2 == 1 {
                sample.push(pi[pairs].clone());
            }
            sample
        })
        .collect()
}

/// Keep records whose case power is at most `percent`% of the ceiling for
/// their decision, with the factor universe taken from all valid records.
/// Records that do not form a valid case are dropped.
pub fn filter_by_power(records: &[CaseRecord], percent: f64) -> Vec<CaseRecord> {
    let valid: Vec<(&CaseRecord, Case)> = records
        .iter()
        .filter_map(|record| match Case::from_record(record) {
            Ok(case) => Some((record, case)),
            Err(e) => {
                tracing::warn!(case_id = %record.fingerprint(), "Skipping case record: {}", e);
                None
            }
        })
        .collect();

    let case_base = CaseBase::from_cases(valid.iter().map(|(_, case)| case.clone()));
    let detector = case_base.power();
    let ceiling = detector.max_edges();

    let kept: Vec<CaseRecord> = valid
        .iter()
        .filter(|(_, case)| {
            let limit = ceiling.for_decision(case.decision()) as f64 * (percent / 100.0);
            detector.case_power(case) as f64 <= limit
        })
        .map(|(record, _)| (*record).clone())
        .collect();

    tracing::info!(
        "Kept {} of {} cases within {}% of max power (pi {}, delta {})",
        kept.len(),
        records.len(),
        percent,
        ceiling.pi,
        ceiling.delta
    );
    kept
}
