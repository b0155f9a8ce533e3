//! Booking engine tests against a real PostgreSQL database.
//!
//! Each test gets a fresh database with migrations applied.
//! Run with: DATABASE_URL=postgres://... cargo test --test booking_engine -- --ignored

use std::sync::Arc;

use sqlx::PgPool;
use tokio::task::JoinSet;

use equipment_booking_server::{
    config::AuthConfig,
    models::{
        equipment::{CreateEquipment, EquipmentStatus, UpdateEquipment},
        user::Role,
    },
    repository::Repository,
    services::Services,
    AppError,
};

fn services(pool: &PgPool) -> Arc<Services> {
    Arc::new(Services::new(Repository::new(pool.clone()), AuthConfig::default()))
}

async fn equipment(services: &Services, name: &str) -> i32 {
    services
        .equipment
        .create(&CreateEquipment {
            name: name.to_string(),
            description: Some(format!("{} for tests", name)),
        })
        .await
        .expect("create equipment")
        .id
}

async fn user(services: &Services, username: &str) -> i32 {
    services
        .auth
        .register(username, "pw123456", None)
        .await
        .expect("register user")
}

async fn booking_count(pool: &PgPool, equipment_id: i32) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE equipment_id = $1")
        .bind(equipment_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Every item has at most one live booking, and is `booked` exactly when it has one
async fn assert_catalog_matches_ledger(pool: &PgPool) {
    let rows: Vec<(i32, String, i64)> = sqlx::query_as(
        r#"
        SELECT e.id, e.status::text, COUNT(b.id)
        FROM equipments e
        LEFT JOIN bookings b ON b.equipment_id = e.id
        GROUP BY e.id, e.status
        "#,
    )
    .fetch_all(pool)
    .await
    .unwrap();

    for (id, status, count) in rows {
        assert!(count <= 1, "equipment {id} has {count} live bookings");
        assert_eq!(status == "booked", count == 1, "equipment {id} is {status} with {count} bookings");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn register_and_login(pool: PgPool) {
    let services = services(&pool);

    let user_id = services.auth.register("alice", "pw123456", None).await.unwrap();

    let (token, user) = services.auth.login("alice", "pw123456").await.unwrap();
    assert_eq!(user.id, user_id);
    let claims = services.auth.verify_token(&token).unwrap();
    assert_eq!(claims.username, "alice");

    let stored: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(!stored.contains("pw123456"));

    let wrong_password = services.auth.login("alice", "nope").await.unwrap_err();
    let unknown_user = services.auth.login("mallory", "pw123456").await.unwrap_err();
    assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    assert!(matches!(wrong_password, AppError::Authentication(_)));

    let duplicate = services.auth.register("alice", "other", None).await.unwrap_err();
    assert!(matches!(duplicate, AppError::Conflict(_)));

    let admin_id = services.auth.register("root", "pw123456", Some("admin")).await.unwrap();
    let (token, admin) = services.auth.login("root", "pw123456").await.unwrap();
    assert_eq!(admin.id, admin_id);
    assert_eq!(admin.role, Role::Admin);
    let claims = services.auth.verify_token(&token).unwrap();
    assert_eq!(claims.role, Role::Admin);
    assert_eq!(claims.user_info().role, Role::Admin);
    assert_eq!(user.role, Role::User);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn booking_marks_equipment_and_cancel_frees_it(pool: PgPool) {
    let services = services(&pool);
    let microscope = equipment(&services, "Microscope").await;
    let alice = user(&services, "alice").await;

    let item = services.equipment.get_by_id(microscope).await.unwrap();
    assert_eq!(item.status, EquipmentStatus::Available);

    let booking_id = services
        .bookings
        .create_booking(microscope, alice, "2025-03-01")
        .await
        .unwrap();
    let item = services.equipment.get_by_id(microscope).await.unwrap();
    assert_eq!(item.status, EquipmentStatus::Booked);

    // any date: the whole item is taken
    let err = services
        .bookings
        .create_booking(microscope, alice, "2025-04-15")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let cancelled = services.bookings.cancel_booking(booking_id).await.unwrap();
    assert_eq!(cancelled.equipment_id, microscope);

    let item = services.equipment.get_by_id(microscope).await.unwrap();
    assert_eq!(item.status, EquipmentStatus::Available);
    assert_eq!(booking_count(&pool, microscope).await, 0);
    assert_catalog_matches_ledger(&pool).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn concurrent_bookings_have_exactly_one_winner(pool: PgPool) {
    const ATTEMPTS: usize = 8;

    let services = services(&pool);
    let centrifuge = equipment(&services, "Centrifuge").await;
    let mut users = Vec::new();
    for i in 0..ATTEMPTS {
        users.push(user(&services, &format!("user{i}")).await);
    }

    let mut attempts = JoinSet::new();
    for (i, user_id) in users.into_iter().enumerate() {
        let services = services.clone();
        attempts.spawn(async move {
            let date = format!("2025-05-{:02}", i + 1);
            services.bookings.create_booking(centrifuge, user_id, &date).await
        });
    }

    let mut successes = 0;
    let mut conflicts = 0;
    while let Some(result) = attempts.join_next().await {
        match result.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, ATTEMPTS - 1);
    assert_eq!(booking_count(&pool, centrifuge).await, 1);
    let item = services.equipment.get_by_id(centrifuge).await.unwrap();
    assert_eq!(item.status, EquipmentStatus::Booked);
    assert_catalog_matches_ledger(&pool).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn cancel_twice_is_not_found(pool: PgPool) {
    let services = services(&pool);
    let scope = equipment(&services, "Oscilloscope").await;
    let alice = user(&services, "alice").await;

    let booking_id = services.bookings.create_booking(scope, alice, "2025-03-01").await.unwrap();

    services.bookings.cancel_booking(booking_id).await.unwrap();
    let err = services.bookings.cancel_booking(booking_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services.bookings.get_by_id(booking_id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn failed_booking_leaves_catalog_untouched(pool: PgPool) {
    let services = services(&pool);
    let laser = equipment(&services, "Laser cutter").await;

    let err = services.bookings.create_booking(laser, 9999, "2025-03-01").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services.bookings.create_booking(9999, 1, "2025-03-01").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = services.bookings.create_booking(laser, 1, "2025-02-30").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let item = services.equipment.get_by_id(laser).await.unwrap();
    assert_eq!(item.status, EquipmentStatus::Available);
    assert_eq!(booking_count(&pool, laser).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn delete_is_blocked_by_live_booking(pool: PgPool) {
    let services = services(&pool);
    let printer = equipment(&services, "3D printer").await;
    let alice = user(&services, "alice").await;

    let booking_id = services.bookings.create_booking(printer, alice, "2025-03-01").await.unwrap();

    let err = services.equipment.delete(printer).await.unwrap_err();
    assert!(matches!(err, AppError::InUse(_)));
    assert!(services.equipment.get_by_id(printer).await.is_ok());

    services.bookings.cancel_booking(booking_id).await.unwrap();
    services.equipment.delete(printer).await.unwrap();

    let err = services.equipment.get_by_id(printer).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = services.equipment.delete(printer).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn delete_racing_a_booking_keeps_the_invariant(pool: PgPool) {
    let services = services(&pool);
    let lathe = equipment(&services, "Lathe").await;
    let alice = user(&services, "alice").await;

    let booking = {
        let services = services.clone();
        tokio::spawn(async move { services.bookings.create_booking(lathe, alice, "2025-03-01").await })
    };
    let deletion = {
        let services = services.clone();
        tokio::spawn(async move { services.equipment.delete(lathe).await })
    };

    let booked = booking.await.unwrap();
    let deleted = deletion.await.unwrap();

    match (booked, deleted) {
        // booking first: delete must have been refused
        (Ok(_), Err(AppError::InUse(_))) => {
            assert_eq!(booking_count(&pool, lathe).await, 1);
        }
        // delete first: booking sees no equipment
        (Err(AppError::NotFound(_)), Ok(())) => {
            assert_eq!(booking_count(&pool, lathe).await, 0);
        }
        (booked, deleted) => panic!("unexpected outcome: {booked:?} / {deleted:?}"),
    }
    assert_catalog_matches_ledger(&pool).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn deleting_parents_cascades_to_bookings(pool: PgPool) {
    let services = services(&pool);
    let drill = equipment(&services, "Drill").await;
    let saw = equipment(&services, "Saw").await;
    let alice = user(&services, "alice").await;
    let bob = user(&services, "bob").await;

    services.bookings.create_booking(drill, alice, "2025-03-01").await.unwrap();
    services.bookings.create_booking(saw, bob, "2025-03-02").await.unwrap();

    sqlx::query("DELETE FROM equipments WHERE id = $1")
        .bind(drill)
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(booking_count(&pool, drill).await, 0);

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(bob)
        .execute(&pool)
        .await
        .unwrap();
    assert_eq!(booking_count(&pool, saw).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn status_updates_respect_bookings(pool: PgPool) {
    let services = services(&pool);
    let kiln = equipment(&services, "Kiln").await;
    let alice = user(&services, "alice").await;

    let set_status = |status| UpdateEquipment {
        name: None,
        description: None,
        status: Some(status),
    };

    let err = services
        .equipment
        .update(kiln, &set_status(EquipmentStatus::Booked))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let item = services
        .equipment
        .update(kiln, &set_status(EquipmentStatus::Maintenance))
        .await
        .unwrap();
    assert_eq!(item.status, EquipmentStatus::Maintenance);

    let err = services.bookings.create_booking(kiln, alice, "2025-03-01").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    services
        .equipment
        .update(kiln, &set_status(EquipmentStatus::Available))
        .await
        .unwrap();
    services.bookings.create_booking(kiln, alice, "2025-03-01").await.unwrap();

    let err = services
        .equipment
        .update(kiln, &set_status(EquipmentStatus::Available))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let renamed = services
        .equipment
        .update(
            kiln,
            &UpdateEquipment {
                name: Some("Big kiln".to_string()),
                description: None,
                status: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Big kiln");
    assert_eq!(renamed.status, EquipmentStatus::Booked);
    assert_catalog_matches_ledger(&pool).await;
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn listings_have_a_fixed_order(pool: PgPool) {
    let services = services(&pool);
    let zoom = equipment(&services, "Zoom lens").await;
    let anvil = equipment(&services, "Anvil").await;
    let mixer = equipment(&services, "Mixer").await;
    let alice = user(&services, "alice").await;
    let bob = user(&services, "bob").await;

    services.bookings.create_booking(zoom, alice, "2025-03-01").await.unwrap();
    services.bookings.create_booking(mixer, alice, "2025-06-01").await.unwrap();
    services.bookings.create_booking(anvil, bob, "2025-04-01").await.unwrap();

    let names: Vec<String> = services
        .equipment
        .list(None)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, ["Anvil", "Mixer", "Zoom lens"]);

    let all = services.bookings.list_bookings(None).await.unwrap();
    let dates: Vec<String> = all.iter().map(|b| b.booking_date.to_string()).collect();
    assert_eq!(dates, ["2025-06-01", "2025-04-01", "2025-03-01"]);
    assert_eq!(all[1].username.as_deref(), Some("bob"));
    assert_eq!(all[1].equipment_name, "Anvil");

    let mine = services.bookings.list_bookings(Some(alice)).await.unwrap();
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|b| b.user_id == alice && b.username.is_none()));
    assert_eq!(mine[0].equipment_name, "Mixer");

    let _spare = equipment(&services, "Bench").await;
    let available = services
        .equipment
        .list(Some(EquipmentStatus::Available))
        .await
        .unwrap();
    assert_eq!(available.len(), 1);
    assert_eq!(available[0].name, "Bench");
}
