//! PGN reading (streaming, via pgn-reader) and variation-tree export.

use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::ControlFlow;
use std::path::Path;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{Chess, Color, Position};

use crate::error::ChessError;
use crate::game_data::{GameMetadata, GameRecord};
use crate::position::{after, fen_of, san_of};
use crate::variation::VariationNode;

const MAX_LINE_WIDTH: usize = 79;

/// Visitor that collects headers and main-line SAN tokens of each game.
struct RecordCollector;

impl Visitor for RecordCollector {
    type Tags = GameMetadata;
    type Movetext = GameRecord;
    type Output = GameRecord;

    fn begin_tags(&mut self) -> ControlFlow<GameRecord, GameMetadata> {
        ControlFlow::Continue(GameMetadata::default())
    }

    fn tag(
        &mut self,
        tags: &mut GameMetadata,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<GameRecord> {
        let value = value.decode_utf8_lossy().into_owned();
        match name {
            b"Event" => tags.event = value,
            b"Site" => tags.site = value,
            b"Date" => tags.date = value,
            b"Round" => tags.round = value,
            b"White" => tags.white = value,
            b"Black" => tags.black = value,
            b"Result" => tags.result = value,
            b"FEN" => tags.start_fen = Some(value),
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: GameMetadata) -> ControlFlow<GameRecord, GameRecord> {
        ControlFlow::Continue(GameRecord {
            metadata: tags,
            moves: Vec::new(),
        })
    }

    fn san(&mut self, movetext: &mut GameRecord, san_plus: SanPlus) -> ControlFlow<GameRecord> {
        movetext.moves.push(san_plus.san.to_string());
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _movetext: &mut GameRecord) -> ControlFlow<GameRecord, Skip> {
        ControlFlow::Continue(Skip(true)) // main line only
    }

    fn end_game(&mut self, movetext: GameRecord) -> GameRecord {
        movetext
    }
}

/// Read every game from a PGN stream, in file order.
pub fn read_games<R: Read>(reader: R) -> Result<Vec<GameRecord>, ChessError> {
    let mut pgn_reader = Reader::new(reader);
    let mut collector = RecordCollector;
    let mut games = Vec::new();

    while let Some(game) = pgn_reader.read_game(&mut collector)? {
        games.push(game);
    }

    Ok(games)
}

pub fn read_games_from_path(path: &Path) -> Result<Vec<GameRecord>, ChessError> {
    let file = File::open(path)?;
    read_games(BufReader::new(file))
}

/// Render a variation tree as a standalone PGN game starting at `start`.
///
/// The root and the first child at each level form the main line; further
/// children become parenthesised variations.
pub fn write_variation_pgn(
    metadata: &GameMetadata,
    start: &Chess,
    root: &VariationNode,
) -> String {
    let mut out = String::new();
    let roster = [
        ("Event", metadata.event.as_str()),
        ("Site", metadata.site.as_str()),
        ("Date", metadata.date.as_str()),
        ("Round", metadata.round.as_str()),
        ("White", metadata.white.as_str()),
        ("Black", metadata.black.as_str()),
        ("Result", "*"),
    ];
    for (name, value) in roster {
        out.push_str(&format!("[{name} \"{}\"]\n", escape_tag(value)));
    }
    out.push_str("[SetUp \"1\"]\n");
    out.push_str(&format!("[FEN \"{}\"]\n\n", fen_of(start)));

    let mut tokens = Vec::new();
    write_moves(&mut tokens, start, std::slice::from_ref(root), true);
    tokens.push("*".to_string());

    let movetext = tokens.join(" ").replace("( ", "(").replace(" )", ")");
    out.push_str(&wrap(&movetext));
    out.push('\n');
    out
}

fn write_moves(tokens: &mut Vec<String>, pos: &Chess, nodes: &[VariationNode], force_number: bool) {
    let Some((main, alternatives)) = nodes.split_first() else {
        return;
    };

    tokens.push(numbered_san(pos, main, force_number));

    for alt in alternatives {
        tokens.push("(".to_string());
        tokens.push(numbered_san(pos, alt, true));
        write_moves(tokens, &after(pos, &alt.mv), &alt.children, false);
        tokens.push(")".to_string());
    }

    write_moves(
        tokens,
        &after(pos, &main.mv),
        &main.children,
        !alternatives.is_empty(),
    );
}

fn numbered_san(pos: &Chess, node: &VariationNode, force_number: bool) -> String {
    let san = san_of(pos, &node.mv);
    let number = pos.fullmoves();
    match pos.turn() {
        Color::White => format!("{number}. {san}"),
        Color::Black if force_number => format!("{number}... {san}"),
        Color::Black => san,
    }
}

fn escape_tag(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn wrap(text: &str) -> String {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split(' ') {
        if !line.is_empty() && line.len() + 1 + word.len() > MAX_LINE_WIDTH {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}
