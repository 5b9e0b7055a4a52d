/// Editor mode a mapping applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMode {
    Normal,
    Insert,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMapping {
    pub mode: MapMode,
    pub unique: bool,
    pub lhs: String,
    pub rhs: String,
}

impl KeyMapping {
    pub fn to_ex_command(&self) -> String {
        let cmd = match self.mode {
            MapMode::Normal => "nmap",
            MapMode::Insert => "imap",
        };
        if self.unique {
            format!("{} <unique> {} {}", cmd, self.lhs, self.rhs)
        } else {
            format!("{} {} {}", cmd, self.lhs, self.rhs)
        }
    }
}

/// cscope `find` query types, in the order they are bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Symbol,
    Definition,
    Callers,
    Text,
    Egrep,
    File,
    Includers,
    Callees,
}

impl QueryKind {
    pub const ALL: [QueryKind; 8] = [
        QueryKind::Symbol,
        QueryKind::Definition,
        QueryKind::Callers,
        QueryKind::Text,
        QueryKind::Egrep,
        QueryKind::File,
        QueryKind::Includers,
        QueryKind::Callees,
    ];

    pub fn letter(self) -> char {
        match self {
            QueryKind::Symbol => 's',
            QueryKind::Definition => 'g',
            QueryKind::Callers => 'c',
            QueryKind::Text => 't',
            QueryKind::Egrep => 'e',
            QueryKind::File => 'f',
            QueryKind::Includers => 'i',
            QueryKind::Callees => 'd',
        }
    }

    /// The search argument, taken from the word or file name under the cursor.
    fn pattern(self) -> &'static str {
        match self {
            QueryKind::File => r#"<C-R>=expand("<cfile>")<CR>"#,
            QueryKind::Includers => r#"^<C-R>=expand("<cfile>")<CR>"#,
            _ => r#"<C-R>=expand("<cword>")<CR>"#,
        }
    }
}

/// Key prefix and the command it runs the query with.
const PREFIXES: [(&str, &str); 3] = [
    (r"<C-\>", "cs find"),
    ("<C-Space>", "scs find"),
    ("<C-Space><C-Space>", "vert scs find"),
];

/// Every query shortcut: each prefix with each query kind, then the insert
/// mode alias that makes `<C-Space>` usable from terminals sending `<C-@>`.
pub fn query_mappings() -> Vec<KeyMapping> {
    let mut mappings = Vec::with_capacity(PREFIXES.len() * QueryKind::ALL.len() + 1);
    for (prefix, command) in PREFIXES {
        for kind in QueryKind::ALL {
            mappings.push(KeyMapping {
                mode: MapMode::Normal,
                unique: true,
                lhs: format!("{}{}", prefix, kind.letter()),
                rhs: format!(":{} {} {}<CR>", command, kind.letter(), kind.pattern()),
            });
        }
    }
    mappings.push(KeyMapping {
        mode: MapMode::Insert,
        unique: false,
        lhs: "<C-@>".to_string(),
        rhs: "<C-Space>".to_string(),
    });
    mappings
}
