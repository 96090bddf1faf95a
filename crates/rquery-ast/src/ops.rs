//! Operator enums used inside the binary/unary node kinds. Grounded on
//! `prqlc-ast`'s `BinOp`/`UnOp`, split three ways here (arithmetic,
//! comparison, logic) since each family has different evaluation rules
//! (logic short-circuits, comparison never folds at construction time).

use strum::{AsRefStr, EnumString};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, AsRefStr, EnumString)]
pub enum ArithOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "**")]
    Pow,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, AsRefStr, EnumString)]
pub enum CmpOp {
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, AsRefStr, EnumString)]
pub enum LogicOp {
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "||")]
    Or,
}
