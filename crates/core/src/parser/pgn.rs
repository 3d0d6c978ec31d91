//! PGN reading into replayable move lists

use pgn_reader::{RawTag, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Move, Position};
use std::fs;
use std::io::Cursor;
use std::ops::ControlFlow;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::parse_fen;

/// A game read from PGN, with its moves resolved against the board
#[derive(Debug, Clone)]
pub struct PgnGame {
    pub event: Option<String>,
    pub site: Option<String>,
    pub date: Option<String>,
    pub white: Option<String>,
    pub black: Option<String>,
    pub result: Option<String>,
    pub white_elo: Option<u16>,
    pub black_elo: Option<u16>,
    /// Position before the first move; the standard setup unless a `FEN` tag says otherwise
    pub start: Chess,
    pub moves: Vec<Move>,
    /// Moves as written in the movetext
    pub san: Vec<String>,
    pub final_position: Chess,
}

impl PgnGame {
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    pub fn summary(&self) -> String {
        let white = self.white.as_deref().unwrap_or("Unknown");
        let black = self.black.as_deref().unwrap_or("Unknown");
        let result = self.result.as_deref().unwrap_or("*");
        format!("{} vs {} - {}", white, black, result)
    }

    /// Every position of the game, start first, final position last
    pub fn positions(&self) -> Vec<Chess> {
        let mut positions = Vec::with_capacity(self.moves.len() + 1);
        let mut current = self.start.clone();
        positions.push(current.clone());
        for mv in &self.moves {
            current = match current.play(mv.clone()) {
                Ok(next) => next,
                Err(_) => break,
            };
            positions.push(current.clone());
        }
        positions
    }
}

#[derive(Default)]
struct GameTags {
    event: Option<String>,
    site: Option<String>,
    date: Option<String>,
    white: Option<String>,
    black: Option<String>,
    result: Option<String>,
    white_elo: Option<u16>,
    black_elo: Option<u16>,
    fen: Option<String>,
}

struct GameMoves {
    tags: GameTags,
    start: Chess,
    moves: Vec<Move>,
    san: Vec<String>,
    current_position: Chess,
    failure: Option<String>,
}

struct GameParser;

impl Visitor for GameParser {
    type Tags = GameTags;
    type Movetext = GameMoves;
    type Output = Result<PgnGame>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(GameTags::default())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        let name_str = String::from_utf8_lossy(name);
        let value_str = value.decode_utf8_lossy().to_string();

        match name_str.as_ref() {
            "Event" => tags.event = Some(value_str),
            "Site" => tags.site = Some(value_str),
            "Date" => tags.date = Some(value_str),
            "White" => tags.white = Some(value_str),
            "Black" => tags.black = Some(value_str),
            "Result" => tags.result = Some(value_str),
            "WhiteElo" => tags.white_elo = value_str.parse().ok(),
            "BlackElo" => tags.black_elo = value_str.parse().ok(),
            "FEN" => tags.fen = Some(value_str),
            _ => {}
        }

        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        let start = match tags.fen.as_deref() {
            Some(fen) => match parse_fen(fen) {
                Ok(pos) => pos,
                Err(e) => return ControlFlow::Break(Err(Error::Pgn(format!("bad FEN tag: {}", e)))),
            },
            None => Chess::default(),
        };

        ControlFlow::Continue(GameMoves {
            tags,
            start: start.clone(),
            moves: Vec::new(),
            san: Vec::new(),
            current_position: start,
            failure: None,
        })
    }

    fn san(&mut self, movetext: &mut Self::Movetext, san: SanPlus) -> ControlFlow<Self::Output> {
        if movetext.failure.is_some() {
            return ControlFlow::Continue(());
        }

        let text = san.san.to_string();
        let ply = movetext.moves.len() + 1;

        match san.san.to_move(&movetext.current_position) {
            Ok(m) => match movetext.current_position.clone().play(m.clone()) {
                Ok(new_pos) => {
                    movetext.current_position = new_pos;
                    movetext.moves.push(m);
                    movetext.san.push(text);
                }
                Err(_) => {
                    movetext.failure = Some(format!("illegal move {} at ply {}", text, ply));
                }
            },
            Err(_) => {
                movetext.failure = Some(format!("illegal move {} at ply {}", text, ply));
            }
        }

        ControlFlow::Continue(())
    }

    fn begin_variation(
        &mut self,
        _movetext: &mut Self::Movetext,
    ) -> ControlFlow<Self::Output, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, movetext: Self::Movetext) -> Self::Output {
        if let Some(failure) = movetext.failure {
            return Err(Error::Pgn(failure));
        }

        Ok(PgnGame {
            event: movetext.tags.event,
            site: movetext.tags.site,
            date: movetext.tags.date,
            white: movetext.tags.white,
            black: movetext.tags.black,
            result: movetext.tags.result,
            white_elo: movetext.tags.white_elo,
            black_elo: movetext.tags.black_elo,
            start: movetext.start,
            moves: movetext.moves,
            san: movetext.san,
            final_position: movetext.current_position,
        })
    }
}

pub fn parse_pgn_file<P: AsRef<Path>>(path: P) -> Result<Vec<PgnGame>> {
    let contents = fs::read_to_string(path)?;
    parse_pgn_string(&contents)
}

/// Reads every game in `pgn`. A game with an illegal move fails the whole read.
pub fn parse_pgn_string(pgn: &str) -> Result<Vec<PgnGame>> {
    let mut parser = GameParser;
    let mut games: Vec<PgnGame> = Vec::new();

    let cursor = Cursor::new(pgn.as_bytes());
    let mut reader = pgn_reader::Reader::new(cursor);

    loop {
        match reader.read_game(&mut parser) {
            Ok(Some(game)) => games.push(game?),
            Ok(None) => break,
            Err(e) => return Err(Error::Pgn(e.to_string())),
        }
    }

    debug!(games = games.len(), "read PGN");

    if games.is_empty() {
        Err(Error::Pgn("no games found".to_string()))
    } else {
        Ok(games)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Color;

    const SAMPLE_PGN: &str = r#"[Event "Test"]
[White "Alice"]
[Black "Bob"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 1-0
"#;

    #[test]
    fn test_parse_pgn_string() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        assert_eq!(games.len(), 1);

        let game = &games[0];
        assert_eq!(game.white.as_deref(), Some("Alice"));
        assert_eq!(game.result.as_deref(), Some("1-0"));
        assert_eq!(game.move_count(), 5);
        assert_eq!(game.san, vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
        assert_eq!(game.summary(), "Alice vs Bob - 1-0");
    }

    #[test]
    fn test_positions_replay_to_final() {
        let games = parse_pgn_string(SAMPLE_PGN).unwrap();
        let game = &games[0];
        let positions = game.positions();
        assert_eq!(positions.len(), 6);
        assert_eq!(positions[0].board(), Chess::default().board());
        assert_eq!(positions[5].board(), game.final_position.board());
        assert_eq!(game.final_position.turn(), Color::Black);
    }

    #[test]
    fn test_fen_tag_sets_start_position() {
        let pgn = r#"[Event "Endgame"]
[SetUp "1"]
[FEN "6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1"]

1. Ra8# 1-0
"#;
        let games = parse_pgn_string(pgn).unwrap();
        let game = &games[0];
        assert_eq!(game.start.board().occupied().count(), 9);
        assert!(game.final_position.is_checkmate());
    }

    #[test]
    fn test_illegal_move_is_an_error() {
        let pgn = "1. e4 e5 2. Ke3 *\n";
        assert!(matches!(parse_pgn_string(pgn), Err(Error::Pgn(_))));
    }

    #[test]
    fn test_empty_input_has_no_games() {
        assert!(matches!(parse_pgn_string(""), Err(Error::Pgn(_))));
    }
}
