//! Mined row generators

use rivven_logminer::logminer::{LogMinerOp, MinedRow, Scn};

/// One insert per SCN into `HR.EMPLOYEES`.
pub fn dml_rows(scns: &[u64]) -> Vec<MinedRow> {
    scns.iter()
        .map(|s| {
            MinedRow::new(Scn::from(*s), LogMinerOp::Insert)
                .with_table("HR", "EMPLOYEES")
                .with_sql_redo(format!(
                    "insert into \"HR\".\"EMPLOYEES\"(\"ID\") values ('{}');",
                    s
                ))
        })
        .collect()
}

/// START, `count` updates and COMMIT on consecutive SCNs from `first`.
pub fn transaction_rows(xid: &str, first: u64, count: u64) -> Vec<MinedRow> {
    let commit = Scn::from(first + count + 1);
    let mut rows = vec![MinedRow::new(Scn::from(first), LogMinerOp::Start)
        .with_transaction(xid, Some(commit))];
    for i in 1..=count {
        rows.push(
            MinedRow::new(Scn::from(first + i), LogMinerOp::Update)
                .with_table("HR", "EMPLOYEES")
                .with_transaction(xid, Some(commit)),
        );
    }
    rows.push(MinedRow::new(commit, LogMinerOp::Commit).with_transaction(xid, Some(commit)));
    rows
}
