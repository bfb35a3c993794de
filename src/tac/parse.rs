//! 把规范文本解析回指令，是渲染的逆操作

use std::str::FromStr;

use logos::Logos;

use crate::cfg::BlockId;
use crate::error::IrError;
use super::operand::{OperandKind, TacToken, classify};
use super::{
    BinaryInst, BinaryTacOp, BranchInst, CallInst, CompareOp, LoadEntryInst, LoadInst, LoadKind, ParamInst,
    ParamMode, ReturnInst, StoreEntryInst, TacInst, UnaryInst, UnaryTacOp,
};

type Tok<'s> = (TacToken, &'s str);

fn malformed(text: &str, reason: impl Into<String>) -> IrError {
    IrError::MalformedInstruction {
        text: text.to_string(),
        reason: reason.into(),
    }
}

fn tokenize(text: &str) -> Result<Vec<Tok<'_>>, IrError> {
    let mut lexer = TacToken::lexer(text);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.slice())),
            Err(()) => return Err(malformed(text, format!("unexpected character at offset {}", lexer.span().start))),
        }
    }
    Ok(tokens)
}

fn block_ref(text: &str, slice: &str) -> Result<BlockId, IrError> {
    slice
        .strip_prefix('B')
        .and_then(|n| n.parse::<u32>().ok())
        .map(BlockId::new)
        .ok_or_else(|| malformed(text, format!("'{}' is not a block reference", slice)))
}

fn compare_op(token: TacToken) -> Option<CompareOp> {
    Some(match token {
        TacToken::EqEq => CompareOp::Eq,
        TacToken::NotEq => CompareOp::Ne,
        TacToken::Lt => CompareOp::Lt,
        TacToken::Le => CompareOp::Le,
        TacToken::Gt => CompareOp::Gt,
        TacToken::Ge => CompareOp::Ge,
        _ => return None,
    })
}

fn binary_op(token: TacToken) -> Option<BinaryTacOp> {
    Some(match token {
        TacToken::Plus => BinaryTacOp::Add,
        TacToken::Minus => BinaryTacOp::Sub,
        TacToken::Star => BinaryTacOp::Mul,
        TacToken::Slash => BinaryTacOp::Div,
        TacToken::Percent => BinaryTacOp::Mod,
        TacToken::AndAnd => BinaryTacOp::And,
        TacToken::OrOr => BinaryTacOp::Or,
        _ => return None,
    })
}

impl FromStr for TacInst {
    type Err = IrError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut tokens = tokenize(text)?;

        // 注释都在末尾
        let code_len = tokens
            .iter()
            .position(|(t, _)| *t == TacToken::Comment)
            .unwrap_or(tokens.len());
        let comments: Vec<String> = tokens
            .drain(code_len..)
            .map(|(token, slice)| {
                if token != TacToken::Comment {
                    return Err(malformed(text, "code after comment"));
                }
                let body = &slice[2..];
                Ok(body.strip_prefix(' ').unwrap_or(body).to_string())
            })
            .collect::<Result<_, _>>()?;

        let Some(((TacToken::Semi, _), code)) = tokens.split_last() else {
            return Err(malformed(text, "missing ';'"));
        };

        let mut inst = parse_code(text, code)?;
        for comment in comments {
            inst.add_comment(comment);
        }
        Ok(inst)
    }
}

fn parse_code(text: &str, code: &[Tok<'_>]) -> Result<TacInst, IrError> {
    use TacToken as T;

    let inst: TacInst = match code {
        [(T::Ident, "if"), (_, left), (op, _), (_, right), (T::Ident, "goto"), (T::Ident, t), (T::Ident, "else"), (T::Ident, e)] =>
        {
            let op = compare_op(*op).ok_or_else(|| malformed(text, "expected a comparison operator"))?;
            BranchInst::new(op, *left, *right, block_ref(text, t)?, block_ref(text, e)?)?.into()
        }

        [(T::Ident, "return")] => ReturnInst::new(None)?.into(),
        [(T::Ident, "return"), (_, value)] => ReturnInst::new(Some(value.to_string()))?.into(),

        [(T::Ident, "param"), (T::Amp, _), (_, value)] => ParamInst::new(ParamMode::Reference, *value)?.into(),
        [(T::Ident, "param"), (_, value)] => ParamInst::new(ParamMode::Standard, *value)?.into(),
        [(T::Ident, "errparam"), (_, value)] => ParamInst::new(ParamMode::Error, *value)?.into(),

        [(T::Ident, "call"), (T::Star, _), (_, target)] => CallInst::indirect(*target, None)?.into(),
        [(T::Ident, "call"), (_, target)] => CallInst::direct(*target, None)?.into(),
        [(_, dest), (T::Assign, _), (T::Ident, "call"), (T::Star, _), (_, target)] => {
            CallInst::indirect(*target, Some(dest.to_string()))?.into()
        }
        [(_, dest), (T::Assign, _), (T::Ident, "call"), (_, target)] => {
            CallInst::direct(*target, Some(dest.to_string()))?.into()
        }

        [(_, dest), (T::Assign, _), (T::Amp, _), (_, label)] => LoadInst::new(LoadKind::Address, *dest, *label)?.into(),

        [(_, dest), (T::Assign, _), (T::Minus, _), (T::LParen, _), (T::Int, value), (T::RParen, _)] => {
            UnaryInst::new(UnaryTacOp::Neg, *dest, *value)?.into()
        }
        [(_, dest), (T::Assign, _), (T::Minus, _), (_, operand)] => {
            UnaryInst::new(UnaryTacOp::Neg, *dest, *operand)?.into()
        }
        [(_, dest), (T::Assign, _), (T::Bang, _), (_, operand)] => {
            UnaryInst::new(UnaryTacOp::Not, *dest, *operand)?.into()
        }

        [(_, dest), (T::Assign, _), (_, base), (T::LBracket, _), (_, index), (T::RBracket, _)] => {
            LoadEntryInst::new(*dest, *base, *index)?.into()
        }
        [(_, base), (T::LBracket, _), (_, index), (T::RBracket, _), (T::Assign, _), (_, src)] => {
            StoreEntryInst::new(*base, *index, *src)?.into()
        }

        [(_, dest), (T::Assign, _), (_, left), (op, _), (_, right)] => {
            let op = binary_op(*op).ok_or_else(|| malformed(text, "expected a binary operator"))?;
            BinaryInst::new(op, *dest, *left, *right)?.into()
        }

        [(_, dest), (T::Assign, _), (_, src)] => {
            let kind = match classify(src) {
                Some(OperandKind::Variable) => LoadKind::Var,
                _ => LoadKind::Const,
            };
            LoadInst::new(kind, *dest, *src)?.into()
        }

        _ => return Err(malformed(text, "unrecognized instruction shape")),
    };
    Ok(inst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tac::{Opcode, TacKind};

    #[test]
    fn test_rendered_text_parses_back() {
        let lines = [
            "if $t0 == null goto B3 else B4;",
            "if a$l > -1 goto B1 else B1;",
            "r$l = call Main.helper;",
            "call *$o2;",
            "return;",
            "return \"done\";",
            "param x$p;",
            "param &x$l;",
            "errparam 0;",
            "$t1 = y$l;",
            "$t1 = false;",
            "$t1 = &Main.helper;",
            "$t2 = arr$l[3];",
            "arr$l[i$l] = $t2;",
            "$t3 = -(7);",
            "$t3 = -(-7);",
            "$t3 = !flag$f_Main;",
            "$t4 = a$l && true;",
            "$t5 = a$l - -3;",
            "$t6 = this;  // self",
        ];
        for line in lines {
            let inst: TacInst = line.parse().unwrap();
            assert_eq!(inst.to_string(), line);
        }
    }

    #[test]
    fn test_multiple_comments() {
        let inst: TacInst = "$t0 = 1;  // first\n  // second".parse().unwrap();
        assert_eq!(inst.comments(), ["first", "second"]);
        assert_eq!(inst.opcode(), Opcode::LoadConst);
    }

    #[test]
    fn test_shape_is_recognized() {
        let inst: TacInst = "$t7 = n$l * 2;".parse().unwrap();
        let TacKind::Binary(binary) = inst.kind() else {
            panic!("expected binary");
        };
        assert_eq!(binary.op(), BinaryTacOp::Mul);
        assert_eq!(binary.right(), "2");
    }

    #[test]
    fn test_bad_text() {
        assert!(matches!(
            "$t0 = 1".parse::<TacInst>(),
            Err(IrError::MalformedInstruction { .. })
        ));
        assert!(matches!(
            "if a$l < b$l goto X1 else B2;".parse::<TacInst>(),
            Err(IrError::MalformedInstruction { .. })
        ));
        assert!(matches!(
            "$t0 = a$l + true;".parse::<TacInst>(),
            Err(IrError::IllegalOperand { opcode: Opcode::Add, .. })
        ));
        assert!(matches!("$t0 = #;".parse::<TacInst>(), Err(IrError::MalformedInstruction { .. })));
    }
}
