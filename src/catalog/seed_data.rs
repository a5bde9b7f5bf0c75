use super::models::PlanEntry;

/// The catalog shipped with the service: three plans for each partner service plus
/// short-lived plans for service 6 used to exercise auto-renewal end to end.
pub fn default_plans() -> Vec<PlanEntry> {
    vec![
        // Nation Media
        PlanEntry::new(
            1,
            "Monthly",
            "0.01",
            30.0,
            &[
                "Daily news access",
                "E-paper access",
                "Breaking news alerts",
                "Basic article commenting",
            ],
        ),
        PlanEntry::new(
            1,
            "6 Months",
            "0.05",
            180.0,
            &[
                "All Monthly features",
                "Premium articles",
                "Archive access",
                "Ad-free experience",
                "15% discount",
            ],
        ),
        PlanEntry::new(
            1,
            "Yearly",
            "0.08",
            365.0,
            &[
                "All 6 Months features",
                "Exclusive content",
                "Priority customer support",
                "Multiple device access",
                "25% discount",
                "Magazine subscription included",
            ],
        ),
        // Showmax Kenya
        PlanEntry::new(
            2,
            "Monthly",
            "0.015",
            30.0,
            &["HD streaming", "Watch on 1 device", "Download shows", "No ads"],
        ),
        PlanEntry::new(
            2,
            "6 Months",
            "0.025",
            180.0,
            &[
                "Full HD streaming",
                "Watch on 2 devices",
                "Download shows",
                "No ads",
                "15% discount",
                "Offline viewing",
            ],
        ),
        PlanEntry::new(
            2,
            "Yearly",
            "0.045",
            365.0,
            &[
                "4K Ultra HD",
                "Watch on 4 devices",
                "Download shows",
                "No ads",
                "Offline viewing",
                "25% discount",
                "Early access to new releases",
            ],
        ),
        // DSTV
        PlanEntry::new(
            3,
            "Monthly",
            "0.02",
            30.0,
            &["Basic channels", "SD quality", "1 device", "Basic support"],
        ),
        PlanEntry::new(
            3,
            "6 Months",
            "0.035",
            180.0,
            &[
                "All channels",
                "HD quality",
                "2 devices",
                "Premium support",
                "Recording feature",
                "15% discount",
            ],
        ),
        PlanEntry::new(
            3,
            "Yearly",
            "0.06",
            365.0,
            &[
                "All 6 Months features",
                "4K quality",
                "4 devices",
                "Priority support",
                "Unlimited recording",
                "25% discount",
                "Sports channels",
            ],
        ),
        // Mdundo
        PlanEntry::new(
            4,
            "Monthly",
            "0.008",
            30.0,
            &["Ad-free music", "Basic quality", "Offline mode", "Basic playlists"],
        ),
        PlanEntry::new(
            4,
            "6 Months",
            "0.03",
            180.0,
            &[
                "High quality audio",
                "Custom playlists",
                "Lyrics access",
                "Premium support",
                "15% discount",
            ],
        ),
        PlanEntry::new(
            4,
            "Yearly",
            "0.05",
            365.0,
            &[
                "All 6 Months features",
                "Highest quality audio",
                "Unlimited downloads",
                "Priority support",
                "25% discount",
                "Early access to new releases",
            ],
        ),
        // Elimu Library
        PlanEntry::new(
            5,
            "Monthly",
            "0.012",
            30.0,
            &["Basic access", "Download PDFs", "Basic search", "Community support"],
        ),
        PlanEntry::new(
            5,
            "6 Months",
            "0.04",
            180.0,
            &[
                "Full access",
                "Advanced search",
                "Citation tools",
                "Premium support",
                "15% discount",
            ],
        ),
        PlanEntry::new(
            5,
            "Yearly",
            "0.07",
            365.0,
            &[
                "All 6 Months features",
                "Research tools",
                "API access",
                "Priority support",
                "25% discount",
                "Exclusive webinars",
            ],
        ),
        // Test service, durations in fractions of a day
        PlanEntry::new(
            6,
            "2 Minutes",
            "0.005",
            0.00139,
            &[
                "Quick test plan",
                "2-minute duration",
                "Auto-renewal testing",
                "Basic features",
            ],
        ),
        PlanEntry::new(
            6,
            "4 Minutes",
            "0.008",
            0.00278,
            &[
                "All 2-minute features",
                "4-minute duration",
                "Premium test features",
                "15% discount",
            ],
        ),
        PlanEntry::new(
            6,
            "6 Minutes",
            "0.01",
            0.00417,
            &[
                "All 4-minute features",
                "6-minute duration",
                "Advanced test features",
                "25% discount",
                "Priority support",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn every_service_has_three_plans() {
        let mut per_service = BTreeMap::new();
        for plan in default_plans() {
            *per_service.entry(plan.service_id).or_insert(0) += 1;
        }
        assert_eq!(per_service.len(), 6);
        assert!(per_service.values().all(|count| *count == 3));
    }

    #[test]
    fn prices_convert_to_wei() {
        for plan in default_plans() {
            assert!(
                crate::chain::to_wei(&plan.price).is_ok(),
                "{} / {}",
                plan.service_id,
                plan.name
            );
            assert!(plan.duration > 0.0);
            assert!(!plan.features.is_empty());
        }
    }
}
