//! TAC 与控制流图集成测试

use anyhow::Result;

use bantam::cfg::{BlockId, Cfg, LinearItem};
use bantam::error::IrError;
use bantam::tac::{
    BinaryInst, BinaryTacOp, BranchInst, CallInst, CompareOp, LoadInst, LoadKind, ParamInst, ParamMode, ReturnInst,
    TacInst,
};

/// if (x < 10) { y = x + 1; } else { y = 0; } return y;
fn if_else() -> Result<(Cfg, [BlockId; 4])> {
    let mut cfg = Cfg::new();
    let entry = cfg.new_block(1);
    let then_b = cfg.new_block(2);
    let else_b = cfg.new_block(3);
    let exit = cfg.new_block(4);

    cfg.append(entry, BranchInst::new(CompareOp::Lt, "x$p", "10", then_b, else_b)?.into())?;
    cfg.add_edge(entry, then_b)?;
    cfg.add_edge(entry, else_b)?;

    cfg.append(then_b, BinaryInst::new(BinaryTacOp::Add, "y$l", "x$p", "1")?.into())?;
    cfg.add_edge(then_b, exit)?;

    cfg.append(else_b, LoadInst::new(LoadKind::Const, "y$l", "0")?.into())?;
    cfg.add_edge(else_b, exit)?;

    cfg.append(exit, ReturnInst::new(Some("y$l".to_string()))?.into())?;
    Ok((cfg, [entry, then_b, else_b, exit]))
}

#[test]
fn test_true_branch_is_next_and_false_branch_jumps() -> Result<()> {
    let (mut cfg, [entry, then_b, else_b, _]) = if_else()?;
    cfg.check_all()?;

    let order = cfg.linearize(entry)?;
    assert_eq!(order[0], entry);
    assert_eq!(order[1], then_b);
    let else_pos = order.iter().position(|b| *b == else_b).expect("else block is reachable");
    assert!(else_pos > 1);

    let items = cfg.emit(entry)?;
    let branch_pos = items
        .iter()
        .position(|item| matches!(item, LinearItem::Inst(inst) if inst.is_branch()))
        .expect("branch is emitted");
    assert_eq!(items[branch_pos + 1], LinearItem::Jump(else_b));
    Ok(())
}

#[test]
fn test_linearize_twice_is_stable() -> Result<()> {
    let (mut cfg, [entry, ..]) = if_else()?;
    let first = cfg.linearize(entry)?;
    let second = cfg.linearize(entry)?;
    assert_eq!(first, second);
    assert_eq!(cfg.render_linear(entry)?, cfg.render_linear(entry)?);
    Ok(())
}

#[test]
fn test_render_linear_golden() -> Result<()> {
    let (mut cfg, [entry, ..]) = if_else()?;
    let expected = "\
B0:
    if x$p < 10 goto B1 else B2;
    goto B2;
B1:
    y$l = x$p + 1;
B3:
    return y$l;
B2:
    y$l = 0;
    goto B3;";
    assert_eq!(cfg.render_linear(entry)?, expected);
    Ok(())
}

#[test]
fn test_edge_capacity_boundaries() -> Result<()> {
    let mut cfg = Cfg::new();
    let join = cfg.new_block(1);
    let preds: Vec<BlockId> = (0..4).map(|line| cfg.new_block(line)).collect();
    for pred in &preds[..3] {
        cfg.add_edge(*pred, join)?;
    }
    assert!(matches!(
        cfg.add_edge(preds[3], join),
        Err(IrError::TooManyInEdges { limit: 3, .. })
    ));

    let fork = preds[3];
    let a = cfg.new_block(5);
    let b = cfg.new_block(6);
    let c = cfg.new_block(7);
    cfg.add_edge(fork, a)?;
    cfg.add_edge(fork, b)?;
    assert!(matches!(
        cfg.add_edge(fork, c),
        Err(IrError::TooManyOutEdges { limit: 2, .. })
    ));
    Ok(())
}

#[test]
fn test_append_to_sealed_block() -> Result<()> {
    let (mut cfg, [entry, ..]) = if_else()?;
    let before = cfg.block(entry)?.insts().to_vec();
    let extra = ParamInst::new(ParamMode::Standard, "1")?;
    assert_eq!(cfg.append(entry, extra.into()), Err(IrError::BlockSealed { block: entry }));
    assert_eq!(cfg.block(entry)?.insts(), before.as_slice());
    Ok(())
}

#[test]
fn test_check_reports_rendered_block() -> Result<()> {
    let (mut cfg, [_, then_b, _, exit]) = if_else()?;
    cfg.remove_edge(then_b, exit)?;
    let err = cfg.check(then_b).unwrap_err();
    let IrError::MalformedBlock { block, rendered, .. } = &err else {
        panic!("expected malformed block, got {err}");
    };
    assert_eq!(*block, then_b);
    assert!(rendered.contains("y$l = x$p + 1;"));
    assert!(cfg.check_all().is_err());
    Ok(())
}

#[test]
fn test_instruction_text_round_trip() -> Result<()> {
    let insts: Vec<TacInst> = vec![
        CallInst::direct("Main.main", Some("$t0".to_string()))?.into(),
        CallInst::indirect("$o3", None)?.into(),
        ParamInst::new(ParamMode::Reference, "arr$l")?.into(),
        LoadInst::new(LoadKind::Const, "s$l", "\"a;b\"")?.into(),
        TacInst::from(BinaryInst::new(BinaryTacOp::Or, "$t1", "ok$f_Main", "false")?).with_comment("short circuit"),
    ];
    for inst in insts {
        let text = inst.to_string();
        let parsed: TacInst = text.parse()?;
        assert_eq!(parsed, inst);
        assert_eq!(parsed.to_string(), text);
    }
    Ok(())
}
