use skymarshal_core::models::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BotSeverity {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
pub struct BotSuspect {
    #[serde(flatten)]
    pub profile: Profile,
    pub ratio: f64,
    pub bot_probability: BotSeverity,
}

/// Follower/following ratio heuristics for spotting probable bot or spam
/// accounts. An account following 10× more people than follow it back is
/// suspect; 100× is severe.
pub struct BotDetector {
    pub ratio_threshold_suspect: f64,
    pub ratio_threshold_severe: f64,
}

impl Default for BotDetector {
    fn default() -> Self {
        BotDetector {
            ratio_threshold_suspect: 0.1,
            ratio_threshold_severe: 0.01,
        }
    }
}

impl BotDetector {
    /// Suspects sorted ascending by ratio (worst first), capped at `top_n`.
    /// Accounts following nobody are skipped: inactive, not spam.
    pub fn analyze_indicators(&self, profiles: &[Profile], top_n: usize) -> Vec<BotSuspect> {
        let mut suspects: Vec<BotSuspect> = profiles
            .iter()
            .filter(|profile| profile.following_count > 0)
            .filter_map(|profile| {
                let ratio = profile.followers_count as f64 / profile.following_count as f64;
                if ratio >= self.ratio_threshold_suspect {
                    return None;
                }
                let severity = if ratio < self.ratio_threshold_severe {
                    BotSeverity::High
                } else {
                    BotSeverity::Medium
                };
                Some(BotSuspect {
                    profile: profile.clone(),
                    ratio,
                    bot_probability: severity,
                })
            })
            .collect();
        suspects.sort_by(|a, b| {
            a.ratio
                .total_cmp(&b.ratio)
                .then_with(|| a.profile.handle.cmp(&b.profile.handle))
        });
        suspects.truncate(top_n);
        suspects
    }
}
