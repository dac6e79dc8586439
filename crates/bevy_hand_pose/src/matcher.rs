//! Nearest template search for a single live pose.

use crate::config::MatchThresholds;
use crate::error::GestureError;
use crate::library::GestureTemplate;
use crate::pose::PoseSample;

/// Accumulated error of a template that stayed within thresholds on every joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchCost {
    pub sum_distance: f32,
    pub sum_angle: f32,
}

impl MatchCost {
    const MAX: Self = Self {
        sum_distance: f32::INFINITY,
        sum_angle: f32::INFINITY,
    };

    /// Both sums must improve. A candidate that is only closer in distance
    /// (or only in angle) does not replace the current best.
    #[inline]
    pub fn beats(&self, best: &Self) -> bool {
        self.sum_distance < best.sum_distance && self.sum_angle < best.sum_angle
    }
}

/// Compare `sample` against one template joint by joint.
///
/// Returns `Ok(None)` as soon as a joint is out of `thresholds`, without looking
/// at the remaining joints.
pub fn pose_cost(
    sample: &PoseSample,
    template: &PoseSample,
    thresholds: &MatchThresholds,
) -> Result<Option<MatchCost>, GestureError> {
    sample.check_compatible(template)?;

    let mut cost = MatchCost {
        sum_distance: 0.0,
        sum_angle: 0.0,
    };

    for (live, stored) in sample.iter().zip(template.iter()) {
        let distance = live.distance(stored);
        let angle = live.angle_cost(stored);

        // Written so that NaN discards too.
        if (distance <= thresholds.distance && angle <= thresholds.angle) == false {
            return Ok(None);
        }

        cost.sum_distance += distance;
        cost.sum_angle += angle;
    }

    Ok(Some(cost))
}

/// Find the best matching template for `sample`.
///
/// Candidates are visited in order, a later candidate only wins if it
/// [beats](MatchCost::beats) the best one so far, so ties keep the earlier one.
///
/// # Example
///
/// ```
/// use bevy::prelude::*;
/// use bevy_hand_pose::prelude::*;
///
/// let open = PoseSample(vec![JointPose::new(Vec3::new(0.0, 0.1, 0.0), Quat::IDENTITY)]);
/// let fist = PoseSample(vec![JointPose::new(Vec3::new(0.0, 0.02, 0.0), Quat::IDENTITY)]);
///
/// let mut library = GestureLibrary::new();
/// library.add_gesture("open", Hand::Left, open.clone()).unwrap();
/// library.add_gesture("fist", Hand::Left, fist).unwrap();
///
/// let thresholds = MatchThresholds { distance: 0.05, angle: 0.25 };
/// let best = match_pose(&open, library.gestures(), &thresholds).unwrap();
/// assert_eq!(best.map(|g| g.name()), Some("open"));
/// ```
pub fn match_pose<'a>(
    sample: &PoseSample,
    candidates: impl IntoIterator<Item = &'a GestureTemplate>,
    thresholds: &MatchThresholds,
) -> Result<Option<&'a GestureTemplate>, GestureError> {
    if sample.is_empty() {
        return Err(GestureError::EmptyPose);
    }

    let mut best = None;
    let mut best_cost = MatchCost::MAX;

    for candidate in candidates {
        let Some(cost) = pose_cost(sample, candidate.pose(), thresholds)? else {
            continue;
        };

        if cost.beats(&best_cost) {
            best_cost = cost;
            best = Some(candidate);
        }
    }

    Ok(best)
}
