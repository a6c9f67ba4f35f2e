//! Integration tests for the tank arena server and client
//!
//! These tests run the real server stack on a loopback port and talk to it
//! through the client library, plus a few cross-crate world scenarios.

use assert_approx_eq::assert_approx_eq;
use client::game::{ClientWorld, WorldEvent};
use client::network::Client;
use server::config::{Settings, WallConfig};
use server::game::GameLoop;
use server::network::Server;
use server::session::{encode_frame, Session};
use server::world::World;
use shared::{ControlCommand, FireMode, MoveDirection, Vector2D};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn test_settings() -> Settings {
    Settings {
        universe_size: 2000,
        ms_per_frame: 5,
        max_powerups: 0,
        seed: Some(2024),
        walls: vec![WallConfig {
            p1: Vector2D::new(-500.0, 800.0),
            p2: Vector2D::new(500.0, 800.0),
        }],
        ..Settings::default()
    }
}

/// Starts listener and tick loop; returns the address to connect to.
async fn start_server(settings: Settings) -> String {
    let (server_tx, server_rx) = mpsc::unbounded_channel();
    let server = Server::bind("127.0.0.1:0", server_tx).await.unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let session = Session::new(World::new(&settings));
    let game = GameLoop::new(session, server_rx, settings.tick_duration());
    tokio::spawn(server.run());
    tokio::spawn(game.run());
    addr
}

async fn receive(client: &mut Client) -> Vec<WorldEvent> {
    timeout(WAIT, client.receive())
        .await
        .expect("timed out waiting for a frame")
        .expect("connection failed")
}

/// Receives frames until the client's own tank has been mirrored.
async fn wait_for_own_tank(client: &mut Client) {
    for _ in 0..200 {
        if client.world().own_tank().is_some() {
            return;
        }
        receive(client).await;
    }
    panic!("own tank never arrived");
}

/// SESSION TESTS
mod session_tests {
    use super::*;

    #[tokio::test]
    async fn handshake_assigns_ids_and_sends_walls() {
        let addr = start_server(test_settings()).await;

        let mut first = Client::connect(&addr, "alice").await.unwrap();
        let second = Client::connect(&addr, "bob").await.unwrap();
        assert_eq!(first.player_id(), 0);
        assert_eq!(second.player_id(), 1);
        assert_eq!(first.world().world_size, 2000);

        wait_for_own_tank(&mut first).await;
        assert_eq!(first.world().walls.len(), 1);
        assert_eq!(first.world().own_tank().unwrap().name, "alice");
    }

    #[tokio::test]
    async fn command_moves_own_tank() {
        let mut settings = test_settings();
        settings.walls.clear();
        let addr = start_server(settings).await;
        let mut client = Client::connect(&addr, "mover").await.unwrap();
        wait_for_own_tank(&mut client).await;
        let start = client.world().own_tank().unwrap().loc;

        let up = ControlCommand::new(MoveDirection::Up, FireMode::None, Vector2D::UP);
        client.send_command(&up).await.unwrap();

        let mut moved = false;
        for _ in 0..100 {
            receive(&mut client).await;
            let tank = client.world().own_tank().unwrap();
            if tank.bdir == Vector2D::UP && tank.loc != start {
                moved = true;
                break;
            }
        }
        assert!(moved, "tank never moved after an up command");
    }

    #[tokio::test]
    async fn malformed_lines_are_ignored() {
        let addr = start_server(test_settings()).await;
        let mut client = Client::connect(&addr, "noisy").await.unwrap();
        wait_for_own_tank(&mut client).await;

        client
            .send_raw("this is not json\n{\"moving\":\n[1,2,3]\n")
            .await
            .unwrap();
        let aim = ControlCommand::new(MoveDirection::None, FireMode::None, Vector2D::LEFT);
        client.send_command(&aim).await.unwrap();

        let mut aimed = false;
        for _ in 0..100 {
            receive(&mut client).await;
            if client.world().own_tank().unwrap().tdir == Vector2D::LEFT {
                aimed = true;
                break;
            }
        }
        assert!(aimed, "valid command after garbage was not applied");
    }

    #[tokio::test]
    async fn disconnect_is_reported_then_dropped() {
        let addr = start_server(test_settings()).await;
        let mut watcher = Client::connect(&addr, "watcher").await.unwrap();
        let leaver = Client::connect(&addr, "leaver").await.unwrap();
        let leaver_id = leaver.player_id();

        wait_for_own_tank(&mut watcher).await;
        for _ in 0..200 {
            if watcher.world().tanks.contains_key(&leaver_id) {
                break;
            }
            receive(&mut watcher).await;
        }
        assert!(watcher.world().tanks.contains_key(&leaver_id));

        leaver.shutdown().await.unwrap();

        let mut left = false;
        for _ in 0..200 {
            let events = receive(&mut watcher).await;
            if events.contains(&WorldEvent::TankLeft(leaver_id)) {
                left = true;
                break;
            }
        }
        assert!(left, "disconnect was never reported");

        for _ in 0..10 {
            receive(&mut watcher).await;
            assert!(!watcher.world().tanks.contains_key(&leaver_id));
        }
    }

    #[tokio::test]
    async fn projectile_appears_for_other_clients() {
        let mut settings = test_settings();
        settings.walls.clear();
        let addr = start_server(settings).await;
        let mut shooter = Client::connect(&addr, "shooter").await.unwrap();
        let mut watcher = Client::connect(&addr, "watcher").await.unwrap();
        wait_for_own_tank(&mut shooter).await;
        wait_for_own_tank(&mut watcher).await;

        // Aiming at the centre keeps the shell in the world for dozens of ticks.
        let toward_centre = -shooter.world().own_tank().unwrap().loc;
        let fire = ControlCommand::new(MoveDirection::None, FireMode::Main, toward_centre);
        shooter.send_command(&fire).await.unwrap();

        let mut seen = false;
        for _ in 0..100 {
            receive(&mut watcher).await;
            if watcher
                .world()
                .projectiles
                .values()
                .any(|p| p.owner == shooter.player_id())
            {
                seen = true;
                break;
            }
        }
        assert!(seen, "projectile never reached the other client");
    }
}

/// WORLD SCENARIO TESTS
mod scenario_tests {
    use super::*;

    fn quiet_world() -> World {
        let settings = Settings {
            max_powerups: 0,
            seed: Some(1),
            ..Settings::default()
        };
        World::new(&settings)
    }

    #[test]
    fn beam_kills_tank_ten_units_ahead() {
        let mut world = quiet_world();
        let a = world.add_tank("a");
        let b = world.add_tank("b");
        world.tank_mut(a).unwrap().relocate(Vector2D::ZERO);
        world.tank_mut(b).unwrap().relocate(Vector2D::new(10.0, 0.0));
        world.tank_mut(a).unwrap().pick_up_powerup();

        let mut commands = HashMap::new();
        commands.insert(
            a,
            ControlCommand::new(MoveDirection::None, FireMode::Alt, Vector2D::RIGHT),
        );
        world.update(&commands);

        let target = world.tank(b).unwrap();
        assert_eq!(target.hp, 0);
        assert!(target.died);
        assert_eq!(world.tank(a).unwrap().score, 1);
    }

    #[test]
    fn five_ticks_up_moves_twenty_five() {
        let mut world = quiet_world();
        let id = world.add_tank("a");
        world.tank_mut(id).unwrap().relocate(Vector2D::new(100.0, 100.0));

        let mut commands = HashMap::new();
        commands.insert(
            id,
            ControlCommand::decode(r#"{"moving":"up","fire":"none","tdir":{"x":0.0,"y":-1.0}}"#)
                .unwrap(),
        );
        for _ in 0..5 {
            world.update(&commands);
        }
        let loc = world.tank(id).unwrap().loc;
        assert_approx_eq!(loc.x, 100.0);
        assert_approx_eq!(loc.y, 75.0);
    }

    #[test]
    fn client_mirror_matches_server_frame() {
        let mut world = quiet_world();
        let a = world.add_tank("a");
        let b = world.add_tank("b");

        let mut commands = HashMap::new();
        commands.insert(
            a,
            ControlCommand::new(MoveDirection::Right, FireMode::Main, Vector2D::DOWN),
        );
        world.update(&commands);

        let mut mirror = ClientWorld::new(a, 2000);
        for line in encode_frame(&world).unwrap().lines() {
            mirror.apply_line(line);
        }

        assert_eq!(mirror.tanks.len(), 2);
        assert_eq!(mirror.tanks[&a].loc, world.tank(a).unwrap().loc);
        assert_approx_eq!(mirror.tanks[&a].tdir.y, 1.0);
        assert_eq!(mirror.tanks[&b].loc, world.tank(b).unwrap().loc);
        assert_eq!(mirror.projectiles.len(), 1);
        assert_eq!(mirror.projectiles.values().next().unwrap().owner, a);
    }
}
