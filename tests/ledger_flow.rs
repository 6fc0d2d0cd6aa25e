//! End-to-end confirmation flows against the in-memory store

use matchbook::adapters::LogMessenger;
use matchbook::config::AffordanceStyle;
use matchbook::coordinator::{ConfirmationCoordinator, Outcome};
use matchbook::domain::{
    Decision, MatchKind, MatchSubmission, NewParticipant, NewTeam, ParticipantId, ProposalStatus,
};
use matchbook::economy::EconomyAccount;
use matchbook::error::MatchbookError;
use matchbook::ledger::LedgerApplier;
use matchbook::persistence::{MemoryStore, Store};
use matchbook::rating::RatingEngine;
use matchbook::services::NotificationFanout;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const REWARD: i64 = 3;

async fn setup(players: &[i64], house: i64) -> (MemoryStore, ConfirmationCoordinator) {
    let store = MemoryStore::new(1500.0, dec!(5.00));
    store.set_house_balance(house).await;
    for &id in players {
        store
            .register_participant(NewParticipant {
                id: ParticipantId(id),
                display_name: format!("player{}", id),
            })
            .await
            .unwrap();
    }

    let shared: Arc<dyn Store> = Arc::new(store.clone());
    let messenger = Arc::new(LogMessenger::new("results".into(), AffordanceStyle::Buttons));
    let coordinator = ConfirmationCoordinator::new(
        shared.clone(),
        LedgerApplier::new(shared, RatingEngine::default(), EconomyAccount::new(REWARD)),
        messenger.clone(),
        NotificationFanout::new(messenger, vec!["announcements".into()], Duration::ZERO),
        Duration::from_secs(3600),
    );
    (store, coordinator)
}

fn duel(a: i64, b: i64, score_a: i32, score_b: i32) -> MatchSubmission {
    MatchSubmission {
        kind: MatchKind::Duel,
        submitter: ParticipantId(a),
        side_a: vec![ParticipantId(a)],
        side_b: vec![ParticipantId(b)],
        score_a,
        score_b,
    }
}

async fn totals(store: &MemoryStore, players: &[i64]) -> (f64, i64) {
    let ids: Vec<ParticipantId> = players.iter().copied().map(ParticipantId).collect();
    let rows = store.get_participants(&ids).await.unwrap();
    let rating = rows.iter().map(|p| p.rating).sum();
    let coins = rows.iter().map(|p| p.coins).sum();
    (rating, coins)
}

#[tokio::test]
async fn confirmed_duel_updates_ratings_stats_and_coins() {
    let (store, coordinator) = setup(&[1, 2], 100).await;

    let proposal = coordinator.submit(duel(1, 2, 20, 10)).await.unwrap();
    assert_eq!(proposal.status, ProposalStatus::Proposed);
    assert!(coordinator.is_pending(proposal.id));

    let outcome = coordinator
        .resolve(proposal.id, ParticipantId(2), Decision::Confirm)
        .await
        .unwrap();
    let Outcome::Applied(applied) = outcome else {
        panic!("expected an applied outcome");
    };
    assert!(!coordinator.is_pending(proposal.id));

    let winner = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
    let loser = store.get_participant(ParticipantId(2)).await.unwrap().unwrap();
    assert_eq!(winner.display_rating(), 1516);
    assert_eq!(loser.display_rating(), 1484);
    assert_eq!((winner.kills, winner.deaths, winner.matches), (20, 10, 1));
    assert_eq!((loser.kills, loser.deaths, loser.matches), (10, 20, 1));
    assert_eq!(winner.coins, REWARD + 5);
    assert_eq!(loser.coins, REWARD + 5);

    assert_eq!(store.house_account().await.unwrap().balance, 90);
    assert_eq!(applied.entry.proposal_id, proposal.id);
    assert_eq!(
        store.get_proposal(proposal.id).await.unwrap().unwrap().status,
        ProposalStatus::Applied
    );

    coordinator.shutdown();
}

#[tokio::test]
async fn concurrent_confirms_apply_exactly_once() {
    let (store, coordinator) = setup(&[1, 2], 100).await;
    let proposal = coordinator.submit(duel(1, 2, 15, 5)).await.unwrap();

    let (first, second) = tokio::join!(
        coordinator.resolve(proposal.id, ParticipantId(2), Decision::Confirm),
        coordinator.resolve(proposal.id, ParticipantId(2), Decision::Confirm),
    );

    let results = [first, second];
    let applied = results
        .iter()
        .filter(|r| matches!(r, Ok(Outcome::Applied(_))))
        .count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(MatchbookError::Conflict(_))))
        .count();
    assert_eq!((applied, conflicts), (1, 1));
    assert_eq!(store.ledger_len().await, 1);

    let loser = store.get_participant(ParticipantId(2)).await.unwrap().unwrap();
    assert_eq!(loser.matches, 1);

    coordinator.shutdown();
}

#[tokio::test]
async fn ratings_are_conserved_and_coins_come_from_mint_and_house() {
    let players = [1, 2, 3];
    let (store, coordinator) = setup(&players, 1000).await;
    let (rating_before, coins_before) = totals(&store, &players).await;
    let house_before = store.house_account().await.unwrap().balance;

    let results = [(1, 2, 10, 3), (2, 3, 7, 9), (3, 1, 12, 11), (1, 3, 4, 8)];
    for (a, b, sa, sb) in results {
        let proposal = coordinator.submit(duel(a, b, sa, sb)).await.unwrap();
        coordinator
            .resolve(proposal.id, ParticipantId(b), Decision::Confirm)
            .await
            .unwrap();
    }

    let (rating_after, coins_after) = totals(&store, &players).await;
    let house_after = store.house_account().await.unwrap().balance;
    assert!((rating_after - rating_before).abs() < 1e-6);

    // Every duel mints the reward twice; payouts only move coins out of the house
    let minted = 2 * REWARD * results.len() as i64;
    assert_eq!(coins_after + house_after, coins_before + house_before + minted);
    assert!(house_after < house_before);
    assert_eq!(store.ledger_len().await, results.len());

    coordinator.shutdown();
}

#[tokio::test]
async fn submitter_can_withdraw_but_not_confirm() {
    let (store, coordinator) = setup(&[1, 2, 3], 100).await;
    let proposal = coordinator.submit(duel(1, 2, 20, 10)).await.unwrap();

    let err = coordinator
        .resolve(proposal.id, ParticipantId(1), Decision::Confirm)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchbookError::Authorization(_)));

    let err = coordinator
        .resolve(proposal.id, ParticipantId(3), Decision::Deny)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchbookError::Authorization(_)));

    let outcome = coordinator
        .resolve(proposal.id, ParticipantId(1), Decision::Deny)
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Denied { by } if by == ParticipantId(1)));
    assert_eq!(store.ledger_len().await, 0);

    let untouched = store.get_participant(ParticipantId(2)).await.unwrap().unwrap();
    assert_eq!(untouched.matches, 0);
    assert_eq!(untouched.rating, 1500.0);
}

#[tokio::test(start_paused = true)]
async fn unanswered_proposal_expires_without_ledger_effect() {
    let (store, coordinator) = setup(&[1, 2], 100).await;
    let proposal = coordinator.submit(duel(1, 2, 20, 10)).await.unwrap();

    tokio::time::advance(Duration::from_secs(3601)).await;
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(
        store.get_proposal(proposal.id).await.unwrap().unwrap().status,
        ProposalStatus::Expired
    );
    assert!(!coordinator.is_pending(proposal.id));
    assert_eq!(store.ledger_len().await, 0);

    let late = coordinator
        .resolve(proposal.id, ParticipantId(2), Decision::Confirm)
        .await
        .unwrap_err();
    assert!(matches!(late, MatchbookError::Conflict(_)));
}

#[tokio::test]
async fn confirmed_duo_rates_teams_not_players() {
    let (store, coordinator) = setup(&[1, 2, 3, 4], 100).await;
    let home = store
        .create_team(NewTeam {
            kind: MatchKind::Duo,
            name: "Home".into(),
            owner: ParticipantId(1),
            roster: vec![ParticipantId(1), ParticipantId(2)],
        })
        .await
        .unwrap();
    let away = store
        .create_team(NewTeam {
            kind: MatchKind::Duo,
            name: "Away".into(),
            owner: ParticipantId(3),
            roster: vec![ParticipantId(3), ParticipantId(4)],
        })
        .await
        .unwrap();

    let proposal = coordinator
        .submit(MatchSubmission {
            kind: MatchKind::Duo,
            submitter: ParticipantId(1),
            side_a: vec![ParticipantId(1), ParticipantId(2)],
            side_b: vec![ParticipantId(3), ParticipantId(4)],
            score_a: 3,
            score_b: 16,
        })
        .await
        .unwrap();
    assert_eq!(proposal.team_a, Some(home.id));
    assert_eq!(proposal.team_b, Some(away.id));

    coordinator
        .resolve(proposal.id, ParticipantId(4), Decision::Confirm)
        .await
        .unwrap();

    let home = store.get_team(home.id).await.unwrap().unwrap();
    let away = store.get_team(away.id).await.unwrap().unwrap();
    assert_eq!(home.display_rating(), 1484);
    assert_eq!(away.display_rating(), 1516);
    assert_eq!((away.wins, away.losses, away.matches), (1, 0, 1));
    assert_eq!((home.wins, home.losses, home.matches), (0, 1, 1));

    // Team matches leave individual duel ratings and the house alone
    let player = store.get_participant(ParticipantId(1)).await.unwrap().unwrap();
    assert_eq!(player.rating, 1500.0);
    assert_eq!(player.coins, 0);
    assert_eq!(store.house_account().await.unwrap().balance, 100);

    coordinator.shutdown();
}
