//! 基本块结构检查

use crate::error::{IrError, IrResult};
use crate::tac::TacKind;
use super::{BasicBlock, BlockId, Cfg};

fn malformed(block: &BasicBlock, reason: String) -> IrError {
    IrError::MalformedBlock {
        block: block.id(),
        reason,
        rendered: block.to_string(),
    }
}

impl Cfg {
    /// 检查一个块：
    /// 1. 空块恰好 1 条出边
    /// 2. 以条件跳转结尾：恰好 2 条出边，且正是跳转的两个目标（不计顺序）
    /// 3. 以 return 结尾：0 或 1 条出边
    /// 4. 其余：恰好 1 条出边
    /// 5. 相邻块循环深度相差不超过 1，前驱和后继里各自最多一个不同
    pub fn check(&self, id: BlockId) -> IrResult<()> {
        let block = self.block(id)?;
        let out = block.succs().len();

        match block.last().map(|inst| inst.kind()) {
            None if out != 1 => {
                return Err(malformed(
                    block,
                    format!("empty block must have exactly one successor, found {}", out),
                ));
            }
            Some(TacKind::Branch(branch)) => {
                if out != 2 {
                    return Err(malformed(
                        block,
                        format!("block ending in a branch must have two successors, found {}", out),
                    ));
                }
                let mut expected = [branch.on_true(), branch.on_false()];
                let mut actual = [block.succs()[0], block.succs()[1]];
                expected.sort();
                actual.sort();
                if expected != actual {
                    return Err(malformed(
                        block,
                        format!(
                            "branch targets {} and {} do not match the successors",
                            branch.on_true(),
                            branch.on_false()
                        ),
                    ));
                }
            }
            Some(TacKind::Return(_)) if out > 1 => {
                return Err(malformed(
                    block,
                    format!("block ending in a return may have at most one successor, found {}", out),
                ));
            }
            Some(TacKind::Return(_)) | None => {}
            Some(_) if out != 1 => {
                return Err(malformed(
                    block,
                    format!("block must have exactly one successor, found {}", out),
                ));
            }
            Some(_) => {}
        }

        for (direction, neighbours) in [("predecessor", block.preds()), ("successor", block.succs())] {
            let mut differing = 0;
            for &neighbour in neighbours {
                let depth = self.block(neighbour)?.loop_depth();
                let diff = depth.abs_diff(block.loop_depth());
                if diff > 1 {
                    return Err(malformed(
                        block,
                        format!("loop depth of {} {} differs by {}", direction, neighbour, diff),
                    ));
                }
                if diff == 1 {
                    differing += 1;
                }
            }
            if differing > 1 {
                return Err(malformed(
                    block,
                    format!("{} {}s differ in loop depth, at most one may", differing, direction),
                ));
            }
        }
        Ok(())
    }

    /// 检查所有块，遇到第一个错误就返回
    pub fn check_all(&self) -> IrResult<()> {
        self.blocks().try_for_each(|block| self.check(block.id()))
    }
}

#[cfg(test)]
mod tests {
    use crate::cfg::Cfg;
    use crate::error::IrError;
    use crate::tac::{BinaryInst, BinaryTacOp, BranchInst, CompareOp, ReturnInst};

    #[test]
    fn test_empty_block_needs_one_successor() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(1);
        assert!(matches!(cfg.check(a), Err(IrError::MalformedBlock { block, .. }) if block == a));
        let b = cfg.new_block(2);
        cfg.add_edge(a, b).unwrap();
        assert!(cfg.check(a).is_ok());
    }

    #[test]
    fn test_branch_successors_must_match_targets() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(1);
        let t = cfg.new_block(2);
        let e = cfg.new_block(3);
        let other = cfg.new_block(4);
        cfg.append(a, BranchInst::new(CompareOp::Lt, "i$l", "3", t, e).unwrap().into()).unwrap();
        cfg.add_edge(a, e).unwrap();
        cfg.add_edge(a, other).unwrap();

        let err = cfg.check(a).unwrap_err();
        let IrError::MalformedBlock { reason, rendered, .. } = err else {
            panic!("expected a malformed block");
        };
        assert!(reason.contains("do not match"));
        assert!(rendered.contains("if i$l < 3 goto B1 else B2;"));

        cfg.remove_edge(a, other).unwrap();
        cfg.add_edge(a, t).unwrap();
        assert!(cfg.check(a).is_ok());
    }

    #[test]
    fn test_return_block_edges() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(1);
        cfg.append(a, ReturnInst::new(None).unwrap().into()).unwrap();
        assert!(cfg.check(a).is_ok());

        let x = cfg.new_block(2);
        let y = cfg.new_block(3);
        cfg.add_edge(a, x).unwrap();
        assert!(cfg.check(a).is_ok());
        cfg.add_edge(a, y).unwrap();
        assert!(cfg.check(a).is_err());
    }

    #[test]
    fn test_straight_line_block_needs_one_successor() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(1);
        cfg.append(a, BinaryInst::new(BinaryTacOp::Add, "$t0", "1", "2").unwrap().into()).unwrap();
        assert!(cfg.check(a).is_err());
    }

    #[test]
    fn test_loop_depth_rules() {
        let mut cfg = Cfg::new();
        let a = cfg.new_block(1);
        let deep = cfg.new_block(2);
        cfg.add_edge(a, deep).unwrap();
        cfg.block_mut(deep).unwrap().set_loop_depth(2);
        let err = cfg.check(a).unwrap_err();
        assert!(err.to_string().contains("differs by 2"));

        cfg.block_mut(deep).unwrap().set_loop_depth(1);
        assert!(cfg.check(a).is_ok());

        // 两个前驱都与本块深度不同
        let join = cfg.new_block(3);
        let p1 = cfg.new_block(4);
        let p2 = cfg.new_block(5);
        let exit = cfg.new_block(6);
        cfg.add_edge(p1, join).unwrap();
        cfg.add_edge(p2, join).unwrap();
        cfg.add_edge(join, exit).unwrap();
        cfg.block_mut(join).unwrap().set_loop_depth(1);
        cfg.block_mut(exit).unwrap().set_loop_depth(1);
        assert!(cfg.check(join).unwrap_err().to_string().contains("2 predecessors differ"));

        cfg.block_mut(p1).unwrap().set_loop_depth(1);
        assert!(cfg.check(join).is_ok());
    }
}
