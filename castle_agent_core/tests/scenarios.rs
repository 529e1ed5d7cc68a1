use castle_agent_core::{
    Agent, AgentError, Outcome, PlayerKind, Session, SimulatedCastle,
    observation::LossRecord,
    session::SessionError,
};

fn play(text: &str, player: PlayerKind, seed: u64) -> (Session<SimulatedCastle>, Result<Outcome, SessionError>) {
    let castle = SimulatedCastle::parse(text, seed).expect("castle parses");
    let mut session = Session::new(Agent::new(&player.config()), castle);
    let outcome = session.run().map(|report| report.outcome);
    (session, outcome)
}

#[test]
fn finds_the_frog_in_a_disconnected_wing() {
    let text = r#"
        room hall hall -
        room study study "books,candles"
        link hall east study
        exit hall south

        # not reachable from the hall
        room tower tower -
        room attic attic dusty
        link tower up attic
        exit tower west
        frog attic
        start hall
    "#;

    for seed in 0..4 {
        let (session, outcome) = play(text, PlayerKind::Breadcrumb, seed);
        assert!(matches!(outcome, Ok(Outcome::Won(_))), "seed {seed}: {outcome:?}");
        let navigator = session.agent().navigator();
        // The tower door is taken with the frog in hand, so only the hall exit
        // is ever recorded.
        assert_eq!(navigator.discovered_exits().len(), 1);
        assert_eq!(navigator.discovered_exits()[0].room.to_string(), "[hall]");
        assert!(session.agent().inventory().goal_carried());
    }
}

#[test]
fn tower_that_looks_like_the_study_is_still_searched() {
    let text = r#"
        room hall hall -
        room study study "books,candles"
        link hall east study
        exit hall south

        # indistinguishable from the study
        room tower study "books,candles"
        room attic attic dusty
        link tower up attic
        exit tower west
        frog attic
        start hall
    "#;

    for seed in 0..6 {
        let (session, outcome) = play(text, PlayerKind::Breadcrumb, seed);
        assert!(matches!(outcome, Ok(Outcome::Won(_))), "seed {seed}: {outcome:?}");
        assert!(session.agent().inventory().goal_carried());
    }
}

#[test]
fn castle_without_exit_ends_exhausted() {
    let text = "room a cell -\nroom b cell bars\nlink a north b\nfrog b";
    let (session, outcome) = play(text, PlayerKind::Breadcrumb, 0);
    assert!(matches!(
        outcome,
        Err(SessionError::Agent(AgentError::ExhaustedWithNoExit { rooms: 2 }))
    ));
    // The castle still got told to stop.
    assert!(session.transport().is_over());
    assert_eq!(session.report().map(|report| &report.outcome), Some(&Outcome::Stopped));
}

#[test]
fn self_preservation_flees_unarmed_and_still_wins() {
    let text = r#"
        room gate gatehouse -
        room den den bones
        room vault vault gold
        link gate down den
        link gate east vault
        exit gate north
        threat den attacked wolf
        treasure vault crown 20
        treasure vault art 90
        frog vault
    "#;
    let (session, outcome) = play(text, PlayerKind::SelfPreservation, 1);
    let Ok(Outcome::Won(win)) = outcome else {
        panic!("expected a win, got {outcome:?}");
    };
    assert_eq!(win.score, serde_json::json!(20));
    assert_eq!(session.agent().inventory().treasure_value(), 20);
}

#[test]
fn fighter_upgrades_and_fights() {
    let text = r#"
        room armory armory -
        room pit pit -
        link armory down pit
        exit armory north
        weapon armory club 2
        weapon armory axe 7
        threat pit attacked goblin
        frog pit
    "#;
    let (session, outcome) = play(text, PlayerKind::Fighter, 3);
    assert!(matches!(outcome, Ok(Outcome::Won(_))), "{outcome:?}");
    let weapons = session.agent().inventory().weapons();
    assert_eq!(weapons.len(), 1);
    assert_eq!(weapons[0].name, "axe");
}

#[test]
fn moat_is_a_way_out_and_the_turn_limit_is_a_loss() {
    // The only way out leads into the moat.
    let text = "room a keep -\nmoat a down\nfrog a";
    let (_, outcome) = play(text, PlayerKind::Greedy, 0);
    assert!(matches!(outcome, Ok(Outcome::Won(_))), "{outcome:?}");

    let text = "room a keep -\nroom b yard -\nlink a east b\nexit b up\nfrog a";
    let castle = SimulatedCastle::parse(text, 0).expect("castle parses").with_max_turns(2);
    let mut session = Session::new(Agent::new(&PlayerKind::Breadcrumb.config()), castle);
    let outcome = session.run().map(|report| report.outcome);
    assert!(
        matches!(outcome, Ok(Outcome::Lost(LossRecord::Error(_)))),
        "{outcome:?}"
    );
}
