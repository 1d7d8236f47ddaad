// ═══════════════════════════════════════════════════════════════════
// Mutation Tests — create, scoped family edits, delete, regenerate,
// pay toggles, and derived totals
// ═══════════════════════════════════════════════════════════════════

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use expense_ledger_core::errors::LedgerError;
use expense_ledger_core::models::draft::ExpenseDraft;
use expense_ledger_core::models::ledger::Ledger;
use expense_ledger_core::models::occurrence::{EditScope, Occurrence};
use expense_ledger_core::services::family;
use expense_ledger_core::services::mutation::MutationEngine;

fn dt(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

/// Fixed "now" for the whole suite: 2024-06-20. Installment families
/// created around it straddle past and future.
fn now() -> DateTime<Utc> {
    dt(2024, 6, 20)
}

fn members_sorted(ledger: &Ledger, family_id: Uuid) -> Vec<&Occurrence> {
    let mut members = family::members_of(&ledger.occurrences, family_id);
    members.sort_by_key(|o| o.installment_index);
    members
}

/// State fingerprint that ignores `updated_at`.
fn fingerprint(ledger: &Ledger) -> Vec<(Uuid, String, i64, String, bool, Option<DateTime<Utc>>)> {
    ledger
        .occurrences
        .iter()
        .map(|o| {
            (
                o.id,
                o.title.clone(),
                o.amount,
                o.category.clone(),
                o.is_paid,
                o.paid_at,
            )
        })
        .collect()
}

mod create {
    use super::*;

    #[test]
    fn appends_whole_family_and_recomputes_totals() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();

        let draft = ExpenseDraft::installments("Sofa", 1_200, dt(2024, 6, 5), "Home", 12);
        let family_id = engine.create(&mut ledger, &draft, now()).unwrap();

        assert_eq!(ledger.len(), 12);
        assert_eq!(members_sorted(&ledger, family_id).len(), 12);
        assert_eq!(ledger.total_unpaid(), 1_200);
        // Only the June 2024 installment counts toward the monthly total
        assert_eq!(ledger.monthly_unpaid(), 100);
    }

    #[test]
    fn invalid_draft_leaves_ledger_untouched() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();

        let draft = ExpenseDraft::installments("Broken", 1_200, dt(2024, 6, 5), "Home", 12)
            .starting_at_installment(99);
        assert!(engine.create(&mut ledger, &draft, now()).is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn distinct_creates_get_distinct_family_ids() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();

        let draft = ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food");
        let a = engine.create(&mut ledger, &draft, now()).unwrap();
        let b = engine.create(&mut ledger, &draft, now()).unwrap();
        assert_ne!(a, b);
    }
}

mod edit_single {
    use super::*;

    #[test]
    fn replaces_only_the_matching_occurrence() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::installments("Sofa", 1_200, dt(2024, 6, 5), "Home", 3);
        let family_id = engine.create(&mut ledger, &draft, now()).unwrap();

        let mut edited = members_sorted(&ledger, family_id)[1].clone();
        edited.amount = 999;
        edited.category = "Furniture".into();
        let later = dt(2024, 6, 21);
        engine.edit_single(&mut ledger, edited.clone(), later).unwrap();

        let members = members_sorted(&ledger, family_id);
        assert_eq!(members[1].amount, 999);
        assert_eq!(members[1].category, "Furniture");
        assert_eq!(members[1].updated_at, later);
        // Siblings untouched
        assert_eq!(members[0].amount, 400);
        assert_eq!(members[2].category, "Home");
    }

    #[test]
    fn created_at_and_family_id_are_immutable() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food");
        let family_id = engine.create(&mut ledger, &draft, now()).unwrap();

        let original = ledger.occurrences[0].clone();
        let mut tampered = original.clone();
        tampered.family_id = Uuid::new_v4();
        tampered.amount = 500;
        engine.edit_single(&mut ledger, tampered, dt(2024, 6, 22)).unwrap();

        let stored = &ledger.occurrences[0];
        assert_eq!(stored.family_id, family_id);
        assert_eq!(stored.created_at, original.created_at);
        assert_eq!(stored.amount, 500);
    }

    #[test]
    fn paying_edit_without_timestamp_is_stamped_now() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food");
        engine.create(&mut ledger, &draft, now()).unwrap();

        let mut edited = ledger.occurrences[0].clone();
        edited.is_paid = true;
        edited.paid_at = None;
        engine.edit_single(&mut ledger, edited, now()).unwrap();

        let occ = &ledger.occurrences[0];
        assert!(occ.is_paid);
        assert_eq!(occ.paid_at, Some(now()));
    }

    #[test]
    fn unpaid_edit_drops_a_stale_timestamp() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food");
        engine.create(&mut ledger, &draft, now()).unwrap();
        let id = ledger.occurrences[0].id;
        engine.set_paid(&mut ledger, id, true, None, now()).unwrap();

        let mut edited = ledger.occurrences[0].clone();
        edited.is_paid = false;
        // Caller forgot to clear the timestamp along with the flag
        assert!(edited.paid_at.is_some());
        engine.edit_single(&mut ledger, edited, now()).unwrap();

        let occ = &ledger.occurrences[0];
        assert!(!occ.is_paid);
        assert!(occ.paid_at.is_none());
        assert_eq!(ledger.total_unpaid(), 450);
    }

    #[test]
    fn missing_target_reports_not_found_without_state_change() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food");
        engine.create(&mut ledger, &draft, now()).unwrap();

        let mut phantom = ledger.occurrences[0].clone();
        phantom.id = Uuid::new_v4();
        phantom.amount = 1;

        let before = fingerprint(&ledger);
        let err = engine.edit_single(&mut ledger, phantom, now()).unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
        assert_eq!(fingerprint(&ledger), before);
    }
}

mod edit_family {
    use super::*;

    /// 12 monthly installments anchored on 2024-06-05 as installment 7,
    /// so indices 1..=7 are dated before `now` and 8..=12 after it.
    /// Backfill marks 1..=6 paid.
    fn straddling_family(engine: &MutationEngine, ledger: &mut Ledger) -> Uuid {
        let draft = ExpenseDraft::installments("Sofa", 1_200, dt(2024, 6, 5), "Home", 12)
            .starting_at_installment(7);
        engine.create(ledger, &draft, now()).unwrap()
    }

    #[test]
    fn single_scope_touches_exactly_one() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let family_id = straddling_family(&engine, &mut ledger);

        let mut edited = members_sorted(&ledger, family_id)[7].clone();
        edited.amount = 555;
        let touched = engine
            .edit_family(&mut ledger, &edited, EditScope::Single, now())
            .unwrap();

        assert_eq!(touched, 1);
        let members = members_sorted(&ledger, family_id);
        assert_eq!(members[7].amount, 555);
        assert!(members.iter().enumerate().all(|(i, o)| i == 7 || o.amount == 100));
    }

    #[test]
    fn future_scope_skips_members_dated_before_now() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let family_id = straddling_family(&engine, &mut ledger);

        let mut edited = members_sorted(&ledger, family_id)[6].clone();
        edited.amount = 200;
        edited.category = "Furniture".into();
        let touched = engine
            .edit_family(&mut ledger, &edited, EditScope::Future, now())
            .unwrap();

        // The edited occurrence itself (k=7, past-dated) is always
        // replaced; of the rest only k=8..=12 are future-dated.
        assert_eq!(touched, 6);
        let members = members_sorted(&ledger, family_id);
        for occ in &members[..6] {
            assert_eq!(occ.amount, 100, "past member {:?} changed", occ.installment_index);
            assert_eq!(occ.category, "Home");
        }
        for occ in &members[6..] {
            assert_eq!(occ.amount, 200);
            assert_eq!(occ.category, "Furniture");
        }
    }

    #[test]
    fn all_scope_rebases_titles_and_keeps_suffixes() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let family_id = straddling_family(&engine, &mut ledger);

        let mut edited = members_sorted(&ledger, family_id)[0].clone();
        edited.title = "Couch (1/12)".into();
        let touched = engine
            .edit_family(&mut ledger, &edited, EditScope::All, now())
            .unwrap();

        assert_eq!(touched, 12);
        let members = members_sorted(&ledger, family_id);
        for (i, occ) in members.iter().enumerate() {
            assert_eq!(occ.title, format!("Couch ({}/12)", i + 1));
        }
    }

    #[test]
    fn propagation_preserves_each_members_payment_state() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let family_id = straddling_family(&engine, &mut ledger);

        // Backfill marked 1..=6 paid; collect their paid_at stamps
        let paid_before: Vec<Option<DateTime<Utc>>> = members_sorted(&ledger, family_id)
            .iter()
            .map(|o| o.paid_at)
            .collect();

        let mut edited = members_sorted(&ledger, family_id)[8].clone();
        edited.amount = 777;
        engine
            .edit_family(&mut ledger, &edited, EditScope::AllIncludingPast, now())
            .unwrap();

        let members = members_sorted(&ledger, family_id);
        for (occ, expected_paid_at) in members.iter().zip(&paid_before) {
            if occ.id == edited.id {
                continue;
            }
            assert_eq!(&occ.paid_at, expected_paid_at);
            assert_eq!(occ.is_paid, expected_paid_at.is_some());
        }
        assert_eq!(members.iter().filter(|o| o.is_paid).count(), 6);
    }

    #[test]
    fn scoped_edit_keeps_paid_flag_and_timestamp_consistent() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let family_id = straddling_family(&engine, &mut ledger);

        // Edited member is unpaid (k=9); the caller flips the flag but
        // supplies no timestamp
        let mut edited = members_sorted(&ledger, family_id)[8].clone();
        edited.is_paid = true;
        edited.paid_at = None;
        engine
            .edit_family(&mut ledger, &edited, EditScope::All, now())
            .unwrap();

        let members = members_sorted(&ledger, family_id);
        assert!(members[8].is_paid);
        assert_eq!(members[8].paid_at, Some(now()));
    }

    #[test]
    fn all_scope_is_idempotent() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let family_id = straddling_family(&engine, &mut ledger);

        let mut edited = members_sorted(&ledger, family_id)[3].clone();
        edited.amount = 250;
        edited.category = "Living room".into();

        engine
            .edit_family(&mut ledger, &edited, EditScope::All, now())
            .unwrap();
        let after_once = fingerprint(&ledger);

        engine
            .edit_family(&mut ledger, &edited, EditScope::All, dt(2024, 6, 25))
            .unwrap();
        assert_eq!(fingerprint(&ledger), after_once);
    }

    #[test]
    fn unknown_family_reports_not_found() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        straddling_family(&engine, &mut ledger);

        let mut phantom = ledger.occurrences[0].clone();
        phantom.id = Uuid::new_v4();
        phantom.family_id = Uuid::new_v4();

        let err = engine
            .edit_family(&mut ledger, &phantom, EditScope::All, now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}

mod deletion {
    use super::*;

    #[test]
    fn delete_family_removes_every_member() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let keep = engine
            .create(&mut ledger, &ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food"), now())
            .unwrap();
        let doomed = engine
            .create(
                &mut ledger,
                &ExpenseDraft::installments("Sofa", 1_200, dt(2024, 6, 5), "Home", 12),
                now(),
            )
            .unwrap();

        let removed = engine.delete_family(&mut ledger, doomed, now()).unwrap();
        assert_eq!(removed, 12);
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.occurrences[0].family_id, keep);
        assert_eq!(ledger.total_unpaid(), 450);
    }

    #[test]
    fn delete_family_not_found_is_observable() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let err = engine
            .delete_family(&mut ledger, Uuid::new_v4(), now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }

    #[test]
    fn delete_by_title_matches_any_suffix() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        engine
            .create(
                &mut ledger,
                &ExpenseDraft::installments("Sofa", 1_200, dt(2024, 6, 5), "Home", 12),
                now(),
            )
            .unwrap();
        engine
            .create(&mut ledger, &ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food"), now())
            .unwrap();

        let removed = engine
            .delete_family_by_title(&mut ledger, "Sofa (7/12)", now())
            .unwrap();
        assert_eq!(removed, 12);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn delete_occurrence_leaves_siblings() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let family_id = engine
            .create(
                &mut ledger,
                &ExpenseDraft::installments("Sofa", 900, dt(2024, 6, 5), "Home", 3),
                now(),
            )
            .unwrap();

        let victim = members_sorted(&ledger, family_id)[1].id;
        engine.delete_occurrence(&mut ledger, victim, now()).unwrap();

        assert_eq!(ledger.len(), 2);
        assert!(ledger.get(victim).is_none());
    }
}

mod regenerate {
    use super::*;

    #[test]
    fn preserves_manually_recorded_paid_history() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::installments("Sofa", 1_200, dt(2024, 6, 5), "Home", 12);
        let family_id = engine.create(&mut ledger, &draft, now()).unwrap();

        // Mark installments 1..=3 paid by hand with distinct dates
        for (i, day) in [(0, 6), (1, 7), (2, 8)] {
            let id = members_sorted(&ledger, family_id)[i].id;
            engine
                .set_paid(&mut ledger, id, true, Some(dt(2024, 6, day)), now())
                .unwrap();
        }

        // Terms change: total doubles
        let new_draft = ExpenseDraft::installments("Sofa", 2_400, dt(2024, 6, 5), "Home", 12);
        let ids = engine
            .regenerate_family(&mut ledger, &new_draft, family_id, now())
            .unwrap();
        assert_eq!(ids.len(), 12);

        let members = members_sorted(&ledger, family_id);
        assert_eq!(members.len(), 12);
        for (i, occ) in members.iter().enumerate() {
            if i < 3 {
                assert!(occ.is_paid, "installment {} lost its paid flag", i + 1);
                assert_eq!(occ.paid_at, Some(dt(2024, 6, 6 + i as u32)));
            } else {
                assert!(!occ.is_paid);
                assert!(occ.paid_at.is_none());
            }
            assert_eq!(occ.amount, 200);
        }
    }

    #[test]
    fn family_id_survives_the_rebuild() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::installments("Bike", 60_000, dt(2024, 6, 5), "Transport", 6);
        let family_id = engine.create(&mut ledger, &draft, now()).unwrap();

        let new_draft = ExpenseDraft::installments("Bike", 60_000, dt(2024, 6, 5), "Transport", 10);
        engine
            .regenerate_family(&mut ledger, &new_draft, family_id, now())
            .unwrap();

        assert_eq!(family::members_of(&ledger.occurrences, family_id).len(), 10);
    }

    #[test]
    fn rejected_draft_leaves_old_family_in_place() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::installments("Bike", 60_000, dt(2024, 6, 5), "Transport", 6);
        let family_id = engine.create(&mut ledger, &draft, now()).unwrap();
        let before = fingerprint(&ledger);

        let bad = ExpenseDraft::installments("Bike", 60_000, dt(2024, 6, 5), "Transport", 10)
            .starting_at_installment(11);
        assert!(engine
            .regenerate_family(&mut ledger, &bad, family_id, now())
            .is_err());
        assert_eq!(fingerprint(&ledger), before);
    }

    #[test]
    fn unknown_family_reports_not_found() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let draft = ExpenseDraft::installments("Bike", 60_000, dt(2024, 6, 5), "Transport", 6);
        let err = engine
            .regenerate_family(&mut ledger, &draft, Uuid::new_v4(), now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}

mod pay_toggles {
    use super::*;

    #[test]
    fn marking_paid_stamps_now_by_default() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        engine
            .create(&mut ledger, &ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food"), now())
            .unwrap();
        let id = ledger.occurrences[0].id;

        engine.set_paid(&mut ledger, id, true, None, now()).unwrap();
        let occ = ledger.get(id).unwrap();
        assert!(occ.is_paid);
        assert_eq!(occ.paid_at, Some(now()));
    }

    #[test]
    fn override_date_wins() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        engine
            .create(&mut ledger, &ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food"), now())
            .unwrap();
        let id = ledger.occurrences[0].id;

        engine
            .set_paid(&mut ledger, id, true, Some(dt(2024, 6, 3)), now())
            .unwrap();
        assert_eq!(ledger.get(id).unwrap().paid_at, Some(dt(2024, 6, 3)));
    }

    #[test]
    fn unmarking_clears_paid_at() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        engine
            .create(&mut ledger, &ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food"), now())
            .unwrap();
        let id = ledger.occurrences[0].id;

        engine.set_paid(&mut ledger, id, true, None, now()).unwrap();
        engine.set_paid(&mut ledger, id, false, None, now()).unwrap();

        let occ = ledger.get(id).unwrap();
        assert!(!occ.is_paid);
        assert!(occ.paid_at.is_none());
    }

    #[test]
    fn totals_track_pay_state() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        engine
            .create(&mut ledger, &ExpenseDraft::single("Coffee", 450, dt(2024, 6, 1), "Food"), now())
            .unwrap();
        engine
            .create(&mut ledger, &ExpenseDraft::single("Rent", 120_000, dt(2024, 7, 1), "Housing"), now())
            .unwrap();

        assert_eq!(ledger.total_unpaid(), 120_450);
        assert_eq!(ledger.monthly_unpaid(), 450); // June only

        let coffee = ledger.occurrences[0].id;
        engine.set_paid(&mut ledger, coffee, true, None, now()).unwrap();
        assert_eq!(ledger.total_unpaid(), 120_000);
        assert_eq!(ledger.monthly_unpaid(), 0);
    }

    #[test]
    fn unknown_id_reports_not_found() {
        let engine = MutationEngine::new();
        let mut ledger = Ledger::new();
        let err = engine
            .set_paid(&mut ledger, Uuid::new_v4(), true, None, now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));
    }
}
