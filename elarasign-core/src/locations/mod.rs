// Multi-location orchestrator: embed the SignatureRecord at all three
// regions, then extract-and-vote across them for verification.

use crate::canvas::{location_regions, Canvas};
use crate::error::Result;
use crate::lsb;
use crate::signature::{self, LocationId, RECORD_LEN, SignatureRecordV2, Unpacked};

/// Per-location classification produced by extraction, per `spec.md` §4.5:
/// valid (CRC ok), present-but-corrupt (parses but CRC fails), absent
/// (magic/version did not match), or a recognized legacy v1 record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationStatus {
    Valid(SignatureRecordV2),
    PresentButCorrupt(SignatureRecordV2),
    Absent,
    LegacyV1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationFinding {
    pub location_id: LocationId,
    pub status: LocationStatus,
}

/// Outcome of extracting and voting across all three locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionReport {
    pub findings: [LocationFinding; 3],
    /// The signature is present if at least one location yielded a valid record.
    pub signed: bool,
    pub valid_locations: Vec<LocationId>,
    /// Fields from the agreed-upon record, when any location is valid.
    pub best_record: Option<SignatureRecordV2>,
    /// True when only one location is valid (reduced redundancy, not a failure).
    pub reduced_redundancy: bool,
    /// Valid locations whose fields disagree with the majority, when a
    /// majority (>=2 valid locations) exists.
    pub disagreeing_locations: Vec<LocationId>,
}

/// Embed a SignatureRecord at all three locations. Returns the location IDs
/// embedded, in `spec.md` §4.9's `locations_embedded` order.
pub fn sign_locations(
    canvas: &mut Canvas,
    timestamp: u32,
    meta_hash: &[u8; 32],
    content_hash: &[u8; 32],
    flags: u8,
) -> Result<Vec<LocationId>> {
    let regions = location_regions(canvas.width(), canvas.height())?;
    let mut embedded = Vec::with_capacity(3);
    for (location_id, region) in LocationId::all().into_iter().zip(regions.iter()) {
        let record = signature::pack(location_id, timestamp, meta_hash, content_hash, flags);
        lsb::embed(canvas, region, &record)?;
        embedded.push(location_id);
    }
    Ok(embedded)
}

/// Extract the SignatureRecord from all three locations and vote.
pub fn extract_locations(canvas: &Canvas) -> Result<ExtractionReport> {
    let regions = location_regions(canvas.width(), canvas.height())?;

    let mut findings_vec = Vec::with_capacity(3);
    for (location_id, region) in LocationId::all().into_iter().zip(regions.iter()) {
        let bytes = lsb::extract(canvas, region, RECORD_LEN)?;
        let status = match signature::unpack(&bytes) {
            Ok(Unpacked::V2 { record, is_valid: true }) => LocationStatus::Valid(record),
            Ok(Unpacked::V2 { record, is_valid: false }) => LocationStatus::PresentButCorrupt(record),
            Ok(Unpacked::V1Legacy { .. }) => LocationStatus::LegacyV1,
            Err(_) => LocationStatus::Absent,
        };
        findings_vec.push(LocationFinding { location_id, status });
    }
    let findings: [LocationFinding; 3] = findings_vec
        .try_into()
        .expect("exactly three locations are always produced");

    let valid_records: Vec<(LocationId, &SignatureRecordV2)> = findings
        .iter()
        .filter_map(|f| match &f.status {
            LocationStatus::Valid(record) => Some((f.location_id, record)),
            _ => None,
        })
        .collect();

    let valid_locations: Vec<LocationId> = valid_records.iter().map(|(id, _)| *id).collect();
    let signed = !valid_locations.is_empty();
    let reduced_redundancy = valid_locations.len() == 1;

    let (best_record, disagreeing_locations) = vote(&valid_records);

    Ok(ExtractionReport {
        findings,
        signed,
        valid_locations,
        best_record,
        reduced_redundancy,
        disagreeing_locations,
    })
}

/// When at least two locations are valid, their fields are ground truth
/// (majority by identical `(meta_hash_prefix, content_hash_prefix)`); any
/// valid location disagreeing with the majority is flagged for diagnostics
/// rather than silently dropped. With exactly one valid location, that
/// record is accepted outright.
fn vote(
    valid_records: &[(LocationId, &SignatureRecordV2)],
) -> (Option<SignatureRecordV2>, Vec<LocationId>) {
    if valid_records.is_empty() {
        return (None, Vec::new());
    }
    if valid_records.len() == 1 {
        return (Some(valid_records[0].1.clone()), Vec::new());
    }

    // Group by (meta_hash_prefix, content_hash_prefix); majority wins.
    let mut groups: Vec<(([u8; 16], [u8; 16]), Vec<LocationId>)> = Vec::new();
    for (id, record) in valid_records {
        let key = (record.meta_hash_prefix, record.content_hash_prefix);
        if let Some(group) = groups.iter_mut().find(|(k, _)| *k == key) {
            group.1.push(*id);
        } else {
            groups.push((key, vec![*id]));
        }
    }
    groups.sort_by_key(|(_, ids)| std::cmp::Reverse(ids.len()));
    let majority_key = groups[0].0;
    let majority_ids = &groups[0].1;

    let best = valid_records
        .iter()
        .find(|(id, _)| majority_ids.contains(id))
        .map(|(_, record)| (*record).clone());

    let disagreeing: Vec<LocationId> = valid_records
        .iter()
        .filter(|(_, record)| (record.meta_hash_prefix, record.content_hash_prefix) != majority_key)
        .map(|(id, _)| *id)
        .collect();

    (best, disagreeing)
}
