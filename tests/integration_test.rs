mod helpers;

use chrono::NaiveDate;
use equb_backend::error::AppError;
use equb_backend::models::*;
use equb_backend::services::draw_service::NO_ELIGIBLE_MEMBERS;
use equb_backend::services::ActivationMonitor;
use helpers::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Registration
// ============================================================================

#[sqlx::test]
async fn test_register_notifies_every_admin(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let a = create_admin(&db, "Admin A").await;
    let b = create_admin(&db, "Admin B").await;

    let member = create_member(&db, "Liya Haile").await;
    assert_eq!(member.role_enum(), Role::Member);

    for admin in [&a, &b] {
        assert_eq!(
            db.messages_for(admin.id).await,
            vec!["Liya Haile has just registered as a new member.".to_string()]
        );
    }
}

#[sqlx::test]
async fn test_list_includes_admins_but_list_members_does_not(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Abebe").await;
    create_member(&db, "Tigist").await;

    let everyone = db.state.profiles.list(&admin).await.unwrap();
    assert_eq!(everyone.len(), 2);

    let members = db.state.profiles.list_members(&admin, None).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].full_name, "Tigist");
}

#[sqlx::test]
async fn test_member_cannot_use_admin_operations(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let member = create_member(&db, "Solomon").await;

    let err = db
        .state
        .equbs
        .create(&member, equb_input("Nope", 3))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = db.state.profiles.list_members(&member, None).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[sqlx::test]
async fn test_deactivated_member_cannot_authenticate(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let member = create_member(&db, "Bereket").await;

    db.state.profiles.set_active(&admin, member.id, false).await.unwrap();
    let err = db.state.profiles.authenticate(member.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = db.state.profiles.authenticate(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[sqlx::test]
async fn test_export_members_csv(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;

    let err = db.state.profiles.export_members_csv(&admin, None).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(msg) if msg == "No members to export"));

    create_member(&db, "Abebe \"Abe\" Kebede").await;
    let csv = db.state.profiles.export_members_csv(&admin, None).await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(
        lines[0],
        "ID,Full Name,Email,Phone,Location,Role,Wallet Balance,Is Active,Updated At"
    );
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("\"Abebe \"\"Abe\"\" Kebede\""));
    assert!(lines[1].contains(",True,"));
}

// ============================================================================
// Equbs
// ============================================================================

#[sqlx::test]
async fn test_create_equb_derives_due_date_and_pot(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;

    let equb = create_test_equb(&db, &admin, "Month End", 10).await;
    assert_eq!(equb.status_enum(), EqubStatus::Open);
    assert_eq!(equb.winnable_amount, rust_decimal::Decimal::new(10000, 0));
    // Jan 31 + 1 month clamps to the end of February
    assert_eq!(equb.next_due_date, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

    let bad = equb_input("  ", 10);
    let err = db.state.equbs.create(&admin, bad).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[sqlx::test]
async fn test_update_equb_notifies_members(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let equb = create_test_equb(&db, &admin, "Lideta", 3).await;
    let member = create_member(&db, "Saba").await;
    approve_member(&db, &admin, &member, equb.id).await;

    let updated = db
        .state
        .equbs
        .update(&admin, equb.id, equb_input("Lideta Weekly", 3))
        .await
        .unwrap();
    assert_eq!(updated.name, "Lideta Weekly");
    assert_eq!(updated.status_enum(), EqubStatus::Open);

    let messages = db.messages_for(member.id).await;
    assert_eq!(
        messages[0],
        "The details for \"Lideta\" have been updated."
    );
}

#[sqlx::test]
async fn test_update_cannot_shrink_below_approved_members(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let equb = create_test_equb(&db, &admin, "Kazanchis", 3).await;
    for name in ["Hana", "Yonas"] {
        let member = create_member(&db, name).await;
        approve_member(&db, &admin, &member, equb.id).await;
    }

    let err = db
        .state
        .equbs
        .update(&admin, equb.id, equb_input("Kazanchis", 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    let unchanged = db.state.equbs.get(equb.id).await.unwrap();
    assert_eq!(unchanged.max_members, 3);
    assert_eq!(unchanged.status_enum(), EqubStatus::Open);
}

#[sqlx::test]
async fn test_update_that_fills_equb_activates_it(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let equb = create_test_equb(&db, &admin, "Piassa", 3).await;
    let mut members = Vec::new();
    for name in ["Hana", "Yonas"] {
        let member = create_member(&db, name).await;
        approve_member(&db, &admin, &member, equb.id).await;
        members.push(member);
    }

    let updated = db
        .state
        .equbs
        .update(&admin, equb.id, equb_input("Piassa", 2))
        .await
        .unwrap();
    assert_eq!(updated.max_members, 2);
    assert_eq!(updated.status_enum(), EqubStatus::Active);

    let messages = db.messages_for(members[0].id).await;
    assert!(messages
        .contains(&"The Equb group \"Piassa\" is now full and has become Active!".to_string()));
    assert_eq!(db.state.lifecycle.sweep().await.unwrap(), 0);
}

#[sqlx::test]
async fn test_details_and_member_listing(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let fixtures = TestFixtures::create(&db, 2).await;
    let other = create_test_equb(&db, &fixtures.admin, "Other", 4).await;

    let details = db.state.equbs.details(fixtures.equb.id).await.unwrap();
    assert_eq!(details.members.len(), 2);
    assert!(details.winners.is_empty());

    let mine = db.state.equbs.list_for_member(fixtures.members[0].id).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, fixtures.equb.id);
    assert_ne!(mine[0].id, other.id);
}

// ============================================================================
// Memberships and activation
// ============================================================================

#[sqlx::test]
async fn test_request_join_rules(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let equb = create_test_equb(&db, &admin, "Piassa", 3).await;
    let member = create_member(&db, "Rahel").await;

    let membership = db.state.memberships.request_join(&member, equb.id).await.unwrap();
    assert_eq!(membership.status_enum(), MembershipStatus::Pending);
    assert!(db
        .messages_for(admin.id)
        .await
        .contains(&"Rahel has requested to join \"Piassa\".".to_string()));

    // rejected members may ask again
    db.state
        .memberships
        .decide(&admin, member.id, equb.id, MembershipStatus::Rejected)
        .await
        .unwrap();
    assert_eq!(
        db.messages_for(member.id).await[0],
        "Your request to join \"Piassa\" has been rejected."
    );
    db.state.memberships.request_join(&member, equb.id).await.unwrap();

    db.state
        .memberships
        .decide(&admin, member.id, equb.id, MembershipStatus::Approved)
        .await
        .unwrap();
    assert!(db
        .messages_for(admin.id)
        .await
        .contains(&"You have approved Rahel's request for \"Piassa\".".to_string()));

    let err = db.state.memberships.request_join(&member, equb.id).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
    assert!(db.state.memberships.is_member(member.id, equb.id).await.unwrap());
}

#[sqlx::test]
async fn test_request_join_missing_admin_still_succeeds(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let equb = create_test_equb(&db, &admin, "Orphan", 3).await;
    let member = create_member(&db, "Eden").await;
    sqlx::query("UPDATE profiles SET role = 'member' WHERE id = $1")
        .bind(admin.id)
        .execute(&db.pool)
        .await
        .unwrap();

    let membership = db.state.memberships.request_join(&member, equb.id).await.unwrap();
    assert_eq!(membership.status_enum(), MembershipStatus::Pending);
}

#[sqlx::test]
async fn test_equb_activates_exactly_once_when_full(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let fixtures = TestFixtures::create(&db, 3).await;

    assert!(fixtures.equb.is_active());
    assert_eq!(db.state.memberships.approved_count(fixtures.equb.id).await.unwrap(), 3);

    let activation = "The Equb group \"Bole Employees\" is now full and has become Active!";
    for member in &fixtures.members {
        let messages = db.messages_for(member.id).await;
        assert_eq!(messages.iter().filter(|m| *m == activation).count(), 1);
    }

    // a second check neither flips nor notifies again
    assert!(!db.state.lifecycle.activate_if_full(fixtures.equb.id).await.unwrap());
    assert_eq!(db.state.lifecycle.sweep().await.unwrap(), 0);
    let messages = db.messages_for(fixtures.members[0].id).await;
    assert_eq!(messages.iter().filter(|m| *m == activation).count(), 1);

    // joining an Active equb is refused
    let late = create_member(&db, "Late Comer").await;
    let err = db.state.memberships.request_join(&late, fixtures.equb.id).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

#[sqlx::test]
async fn test_sweep_activates_equbs_filled_outside_decide(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let equb = create_test_equb(&db, &admin, "Backfilled", 2).await;

    for name in ["One", "Two"] {
        let member = create_member(&db, name).await;
        sqlx::query(
            "INSERT INTO memberships (user_id, equb_id, status) VALUES ($1, $2, 'approved')",
        )
        .bind(member.id)
        .bind(equb.id)
        .execute(&db.pool)
        .await
        .unwrap();
    }

    let monitor = ActivationMonitor::new(db.state.lifecycle.clone(), Duration::from_secs(30));
    assert_eq!(monitor.run_once().await, 1);
    assert!(db.state.equbs.get(equb.id).await.unwrap().is_active());
    assert_eq!(monitor.run_once().await, 0);
}

// ============================================================================
// Contributions
// ============================================================================

#[sqlx::test]
async fn test_contribution_flow(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let fixtures = TestFixtures::create(&db, 2).await;
    let member = &fixtures.members[0];

    let contribution = db
        .state
        .contributions
        .submit(member, fixtures.equb.id)
        .await
        .unwrap();
    assert_eq!(contribution.status_enum(), ContributionStatus::Pending);
    assert_eq!(contribution.amount, fixtures.equb.contribution_amount);

    assert!(db.messages_for(fixtures.admin.id).await.contains(
        &"New contribution of 1000 ETB from Member 1 for \"Bole Employees\".".to_string()
    ));
    assert_eq!(
        db.messages_for(member.id).await[0],
        "Your contribution for \"Bole Employees\" has been submitted for admin verification."
    );

    let paid = db
        .state
        .contributions
        .mark_paid(&fixtures.admin, contribution.id)
        .await
        .unwrap();
    assert!(paid.is_paid());
    assert_eq!(
        db.messages_for(member.id).await[0],
        "Your payment of 1000 ETB for \"Bole Employees\" has been confirmed."
    );

    let filter = ContributionFilter {
        search: Some("member 1".to_string()),
        status: Some(ContributionStatus::Paid),
    };
    let listed = db.state.contributions.list(&fixtures.admin, &filter).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].equb_name, "Bole Employees");

    let dashboard = db.state.analytics.dashboard().await.unwrap();
    assert_eq!(dashboard.total_contributions, rust_decimal::Decimal::new(1000, 0));
    assert_eq!(dashboard.active_cycles, 1);
    assert_eq!(dashboard.total_members, 2);
}

#[sqlx::test]
async fn test_non_member_cannot_contribute(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let fixtures = TestFixtures::create(&db, 2).await;
    let outsider = create_member(&db, "Outsider").await;

    let err = db
        .state
        .contributions
        .submit(&outsider, fixtures.equb.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[sqlx::test]
async fn test_mark_late_and_member_history(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let fixtures = TestFixtures::create(&db, 2).await;
    let member = &fixtures.members[1];

    let first = db.state.contributions.submit(member, fixtures.equb.id).await.unwrap();
    db.state.contributions.submit(member, fixtures.equb.id).await.unwrap();
    db.state.contributions.mark_late(&fixtures.admin, first.id).await.unwrap();

    let all = db
        .state
        .contributions
        .list_for_member(member, fixtures.equb.id, None)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let late = db
        .state
        .contributions
        .list_for_member(member, fixtures.equb.id, Some(ContributionStatus::Late))
        .await
        .unwrap();
    assert_eq!(late.len(), 1);
    assert_eq!(late[0].id, first.id);
}

// ============================================================================
// Winner draw
// ============================================================================

#[sqlx::test]
async fn test_draw_requires_active_equb(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let equb = create_test_equb(&db, &admin, "Still Open", 3).await;

    let err = db.state.draws.draw(&admin, equb.id).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    let err = db.state.draws.eligible(equb.id).await.unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(msg) if msg == NO_ELIGIBLE_MEMBERS));
}

#[sqlx::test]
async fn test_past_winner_excluded_from_next_draw(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let fixtures = TestFixtures::create(&db, 3).await;
    let winner = &fixtures.members[1];

    let outcome = db
        .state
        .draws
        .confirm(&fixtures.admin, fixtures.equb.id, winner.id)
        .await
        .unwrap();
    assert_eq!(outcome.winner.round, 1);
    assert!(outcome.equb.is_active());
    assert_eq!(
        outcome.equb.next_due_date,
        NaiveDate::from_ymd_opt(2024, 3, 29).unwrap()
    );

    let eligible = db.state.draws.eligible(fixtures.equb.id).await.unwrap();
    assert_eq!(eligible.len(), 2);
    assert!(eligible.iter().all(|p| p.id != winner.id));

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..10 {
        let preview = db
            .state
            .draws
            .draw_with(&fixtures.admin, fixtures.equb.id, &mut rng)
            .await
            .unwrap();
        assert_ne!(preview.candidate.id, winner.id);
        assert_eq!(preview.eligible_count, 2);
    }

    // confirming the same member again is refused
    let err = db
        .state
        .draws
        .confirm(&fixtures.admin, fixtures.equb.id, winner.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));

    let announcement = format!(
        "{} has won round 1 of \"Bole Employees\"!",
        winner.full_name
    );
    assert!(db
        .messages_for(fixtures.members[0].id)
        .await
        .contains(&announcement));
}

#[sqlx::test]
async fn test_last_round_completes_equb(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let fixtures = TestFixtures::create(&db, 3).await;

    let mut rounds = Vec::new();
    for _ in 0..3 {
        let outcome = db
            .state
            .draws
            .draw_and_confirm(&fixtures.admin, fixtures.equb.id)
            .await
            .unwrap();
        rounds.push(outcome);
    }

    assert_eq!(
        rounds.iter().map(|o| o.winner.round).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(rounds[1].equb.is_active());
    assert_eq!(rounds[2].equb.status_enum(), EqubStatus::Completed);

    let mut winners: Vec<Uuid> = rounds.iter().map(|o| o.winner.user_id).collect();
    winners.sort();
    winners.dedup();
    assert_eq!(winners.len(), 3);

    let details = db.state.equbs.details(fixtures.equb.id).await.unwrap();
    assert_eq!(details.winners.len(), 3);
    assert_eq!(details.winners[0].round, 1);

    let err = db
        .state
        .draws
        .draw(&fixtures.admin, fixtures.equb.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

// ============================================================================
// Notifications
// ============================================================================

#[sqlx::test]
async fn test_draw_and_confirm_runs_every_round(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let fixtures = TestFixtures::create(&db, 2).await;
    let draws = &db.state.draws;

    let first = draws
        .draw_and_confirm(&fixtures.admin, fixtures.equb.id)
        .await
        .unwrap();
    assert_eq!(first.winner.round, 1);
    assert_eq!(first.equb.status_enum(), EqubStatus::Active);

    let second = draws
        .draw_and_confirm(&fixtures.admin, fixtures.equb.id)
        .await
        .unwrap();
    assert_eq!(second.winner.round, 2);
    assert_ne!(second.winner.user_id, first.winner.user_id);
    assert_eq!(second.equb.status_enum(), EqubStatus::Completed);

    let err = draws
        .draw_and_confirm(&fixtures.admin, fixtures.equb.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessLogic(_)));
}

#[sqlx::test]
async fn test_broadcast_validation_and_sender_copy(pool: PgPool) {
    let db = TestDatabase::from_pool(pool).await;
    let admin = create_admin(&db, "Admin").await;
    let a = create_member(&db, "Member A").await;
    let b = create_member(&db, "Member B").await;

    let err = db
        .state
        .notifications
        .broadcast(&admin, BroadcastTarget::AllMembers, "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let empty_equb = create_test_equb(&db, &admin, "Empty", 3).await;
    let err = db
        .state
        .notifications
        .broadcast(&admin, BroadcastTarget::EqubMembers(empty_equb.id), "Hi")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let sent = db
        .state
        .notifications
        .broadcast(&admin, BroadcastTarget::AllMembers, "Meeting on Sunday")
        .await
        .unwrap();
    assert_eq!(sent, 3);
    assert_eq!(db.messages_for(a.id).await[0], "Meeting on Sunday");
    assert_eq!(db.messages_for(b.id).await[0], "Meeting on Sunday");
    assert_eq!(
        db.messages_for(admin.id).await[0],
        "You sent: \"Meeting on Sunday...\""
    );

    let sent = db
        .state
        .notifications
        .broadcast(&admin, BroadcastTarget::Member(a.id), "Just you")
        .await
        .unwrap();
    assert_eq!(sent, 2);

    let err = db
        .state
        .notifications
        .broadcast(&a, BroadcastTarget::AllMembers, "Not allowed")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}
