use crate::detection::Detection;

/// Collapses twin detections (the two earrings of a pair) into one.
///
/// Detections are paired greedily, closest first. Anything left without a
/// partner under the threshold is dropped, so only confirmed pairs reach the
/// tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairMerger {
    threshold: f32,
}

impl PairMerger {
    pub fn new(pairing_distance_threshold: f32) -> Self {
        Self {
            threshold: pairing_distance_threshold,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn merge(&self, detections: &[Detection]) -> Vec<Detection> {
        let n = detections.len();
        let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                let dist = (detections[i].position() - detections[j].position()).norm();
                pairs.push((i, j, dist));
            }
        }
        // Stable, so equal distances keep input order
        pairs.sort_by(|a, b| a.2.total_cmp(&b.2));

        let mut consumed = vec![false; n];
        let mut merged = Vec::with_capacity(n / 2);
        for (i, j, dist) in pairs {
            if dist >= self.threshold {
                break;
            }
            if consumed[i] || consumed[j] {
                continue;
            }
            consumed[i] = true;
            consumed[j] = true;
            merged.push(detections[i].midpoint(&detections[j]));
        }
        merged
    }
}
