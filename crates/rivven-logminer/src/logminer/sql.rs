//! Oracle statements for a driver-backed catalog and engine
//!
//! Plain SQL/PL-SQL text builders plus row mappers. The crate carries no
//! Oracle driver; an embedder executes these statements with its own client
//! and feeds the rows back through [`online_segment_from_row`] and
//! [`archived_segment_from_row`].
//!
//! SCNs are rendered as decimal literals. File names are quoted as string
//! literals with embedded quotes doubled.

use super::scn::Scn;
use super::segment::Segment;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Current write position.
pub fn current_scn_query() -> String {
    "SELECT CURRENT_SCN FROM V$DATABASE".to_string()
}

/// Online log groups whose range reaches past `scn`, one member per group.
///
/// Columns: `FILE_NAME`, `SEQUENCE#`, `FIRST_CHANGE#`, `NEXT_CHANGE#`,
/// `STATUS`. The CURRENT group reports its `NEXT_CHANGE#` as NULL or
/// [`Scn::ORACLE_OPEN_MARKER`] depending on the release, so it is always
/// selected.
pub fn online_logs_query(scn: &Scn) -> String {
    format!(
        "SELECT MIN(F.MEMBER) AS FILE_NAME, L.SEQUENCE#, L.FIRST_CHANGE#, \
         L.NEXT_CHANGE#, L.STATUS \
         FROM V$LOG L, V$LOGFILE F \
         WHERE F.GROUP# = L.GROUP# \
         AND (L.NEXT_CHANGE# > {scn} OR L.NEXT_CHANGE# IS NULL OR L.STATUS = 'CURRENT') \
         GROUP BY L.GROUP#, L.SEQUENCE#, L.FIRST_CHANGE#, L.NEXT_CHANGE#, L.STATUS \
         ORDER BY L.FIRST_CHANGE#"
    )
}

/// Every online log group, one member per group.
pub fn all_online_logs_query() -> String {
    "SELECT MIN(F.MEMBER) AS FILE_NAME, L.SEQUENCE#, L.FIRST_CHANGE#, \
     L.NEXT_CHANGE#, L.STATUS \
     FROM V$LOG L, V$LOGFILE F \
     WHERE F.GROUP# = L.GROUP# \
     GROUP BY L.GROUP#, L.SEQUENCE#, L.FIRST_CHANGE#, L.NEXT_CHANGE#, L.STATUS \
     ORDER BY L.FIRST_CHANGE#"
        .to_string()
}

/// Available archived logs with `NEXT_CHANGE# > scn` whose archival
/// completed at least `margin` ago.
///
/// Columns: `FILE_NAME`, `SEQUENCE#`, `FIRST_CHANGE#`, `NEXT_CHANGE#`,
/// `COMPLETION_TIME`, `DEST_ID`. `dest_id` restricts the result to one
/// archive destination.
pub fn archived_logs_query(scn: &Scn, margin: Duration, dest_id: Option<u32>) -> String {
    let mut query = format!(
        "SELECT NAME AS FILE_NAME, SEQUENCE#, FIRST_CHANGE#, NEXT_CHANGE#, COMPLETION_TIME, DEST_ID \
         FROM V$ARCHIVED_LOG \
         WHERE NAME IS NOT NULL AND ARCHIVED = 'YES' AND STATUS = 'A' \
         AND NEXT_CHANGE# > {scn}"
    );
    if !margin.is_zero() {
        query.push_str(&format!(
            " AND COMPLETION_TIME <= SYSDATE - NUMTODSINTERVAL({}, 'SECOND')",
            interval_seconds(margin)
        ));
    }
    if let Some(dest) = dest_id {
        query.push_str(&format!(" AND DEST_ID = {dest}"));
    }
    query.push_str(" ORDER BY FIRST_CHANGE#");
    query
}

/// Files registered with the current LogMiner session.
pub fn registered_logs_query() -> String {
    "SELECT FILENAME FROM V$LOGMNR_LOGS ORDER BY LOW_SCN".to_string()
}

/// Register one log file. The first file of a session uses `NEW`.
pub fn add_logfile_statement(file_name: &str, first: bool) -> String {
    let option = if first { "NEW" } else { "ADDFILE" };
    format!(
        "BEGIN SYS.DBMS_LOGMNR.ADD_LOGFILE(LOGFILENAME => {}, OPTIONS => DBMS_LOGMNR.{option}); END;",
        quote_literal(file_name)
    )
}

/// Unregister one log file.
pub fn remove_logfile_statement(file_name: &str) -> String {
    format!(
        "BEGIN SYS.DBMS_LOGMNR.REMOVE_LOGFILE(LOGFILENAME => {}); END;",
        quote_literal(file_name)
    )
}

/// Start mining `[start, end)` from the registered files with the online
/// dictionary.
///
/// `ENDSCN` is inclusive in LogMiner, so the exclusive bound is rendered as
/// `end - 1`.
pub fn start_logminer_statement(start: &Scn, end: &Scn) -> String {
    let end_inclusive = end.saturating_sub(1).max(*start);
    format!(
        "BEGIN SYS.DBMS_LOGMNR.START_LOGMNR(\
         STARTSCN => {start}, ENDSCN => {end_inclusive}, \
         OPTIONS => DBMS_LOGMNR.DICT_FROM_ONLINE_CATALOG + DBMS_LOGMNR.NO_ROWID_IN_STMT); END;"
    )
}

pub fn end_logminer_statement() -> String {
    "BEGIN SYS.DBMS_LOGMNR.END_LOGMNR(); END;".to_string()
}

/// Decoded rows of the active pass.
pub fn contents_query() -> String {
    "SELECT SCN, COMMIT_SCN, OPERATION_CODE, XID, SEG_OWNER, TABLE_NAME, SQL_REDO, TIMESTAMP \
     FROM V$LOGMNR_CONTENTS ORDER BY SCN"
        .to_string()
}

/// Map one row of [`online_logs_query`].
///
/// Only the CURRENT group is open; its `NEXT_CHANGE#` is read through
/// [`Scn::normalize_upper_bound`]. Any other group is sealed at its
/// `NEXT_CHANGE#`, which may legitimately exceed the 48-bit open marker. A
/// non-current group without a usable upper bound (an UNUSED group, say)
/// holds no redo to mine and maps to `None`.
pub fn online_segment_from_row(
    file_name: String,
    sequence: Option<u64>,
    first_change: Scn,
    next_change: Option<Scn>,
    status: &str,
) -> Option<Segment> {
    let mut segment = if status.eq_ignore_ascii_case("CURRENT") {
        let next_scn = Scn::normalize_upper_bound(next_change);
        let sealed = !next_scn.is_unknown();
        Segment::online(file_name, first_change, next_scn, sealed)
    } else {
        let next_scn = next_change.filter(|n| !n.is_unknown() && !n.is_open_marker())?;
        Segment::online(file_name, first_change, next_scn, true)
    };
    segment.sequence = sequence;
    Some(segment)
}

/// Map one row of [`archived_logs_query`].
pub fn archived_segment_from_row(
    file_name: String,
    sequence: Option<u64>,
    first_change: Scn,
    next_change: Scn,
    completion_time: Option<DateTime<Utc>>,
    dest_id: Option<u32>,
) -> Segment {
    let mut segment = Segment::archived(file_name, first_change, next_change, Utc::now());
    segment.completed_at = completion_time;
    segment.sequence = sequence;
    segment.dest_id = dest_id;
    segment
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn interval_seconds(margin: Duration) -> String {
    let millis = margin.subsec_millis();
    if millis == 0 {
        margin.as_secs().to_string()
    } else {
        format!("{}.{:03}", margin.as_secs(), millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scn(v: u64) -> Scn {
        Scn::from(v)
    }

    #[test]
    fn test_archived_query_without_margin() {
        let q = archived_logs_query(&scn(12345), Duration::ZERO, None);
        assert!(q.contains("NEXT_CHANGE# > 12345"));
        assert!(q.contains("ARCHIVED = 'YES' AND STATUS = 'A'"));
        assert!(!q.contains("COMPLETION_TIME <="));
        assert!(!q.contains("DEST_ID"));
    }

    #[test]
    fn test_archived_query_with_margin_and_destination() {
        let q = archived_logs_query(&scn(1), Duration::from_millis(1500), Some(2));
        assert!(q.contains("NUMTODSINTERVAL(1.500, 'SECOND')"));
        assert!(q.contains("AND DEST_ID = 2"));
        assert!(q.ends_with("ORDER BY FIRST_CHANGE#"));

        let q = archived_logs_query(&scn(1), Duration::from_secs(60), None);
        assert!(q.contains("NUMTODSINTERVAL(60, 'SECOND')"));
    }

    #[test]
    fn test_online_query_keeps_current_group() {
        let q = online_logs_query(&scn(900));
        assert!(q.contains("L.NEXT_CHANGE# > 900"));
        assert!(q.contains("L.STATUS = 'CURRENT'"));
        assert!(q.contains("MIN(F.MEMBER)"));
    }

    #[test]
    fn test_add_logfile_quotes_name() {
        assert_eq!(
            add_logfile_statement("/u01/o'brien/redo01.log", true),
            "BEGIN SYS.DBMS_LOGMNR.ADD_LOGFILE(LOGFILENAME => '/u01/o''brien/redo01.log', \
             OPTIONS => DBMS_LOGMNR.NEW); END;"
        );
        assert!(add_logfile_statement("x", false).contains("DBMS_LOGMNR.ADDFILE"));
        assert!(remove_logfile_statement("x").contains("REMOVE_LOGFILE(LOGFILENAME => 'x')"));
    }

    #[test]
    fn test_start_logminer_end_is_inclusive() {
        let s = start_logminer_statement(&scn(100), &scn(200));
        assert!(s.contains("STARTSCN => 100"));
        assert!(s.contains("ENDSCN => 199"));
    }

    #[test]
    fn test_online_row_mapping() {
        let current = online_segment_from_row(
            "redo03.log".into(),
            Some(3),
            scn(300),
            Some(Scn::ORACLE_OPEN_MARKER),
            "CURRENT",
        )
        .unwrap();
        assert!(current.is_open());
        assert!(!current.sealed);

        let current_null =
            online_segment_from_row("redo03.log".into(), Some(3), scn(300), None, "current")
                .unwrap();
        assert!(current_null.is_open());

        let inactive =
            online_segment_from_row("redo02.log".into(), Some(2), scn(200), Some(scn(300)), "INACTIVE")
                .unwrap();
        assert_eq!(inactive.next_scn, scn(300));
        assert!(inactive.sealed);
        assert_eq!(inactive.sequence, Some(2));

        assert_eq!(
            online_segment_from_row("redo04.log".into(), None, scn(0), None, "UNUSED"),
            None
        );
    }

    #[test]
    fn test_extended_scn_rows_stay_sealed() {
        let inactive = online_segment_from_row(
            "redo01.log".into(),
            Some(41),
            Scn::new(281_474_976_710_605),
            Some(Scn::new(281_474_976_710_665)),
            "INACTIVE",
        )
        .unwrap();
        assert!(!inactive.is_open());
        assert!(inactive.sealed);

        let current = online_segment_from_row(
            "redo02.log".into(),
            Some(42),
            Scn::new(281_474_976_710_665),
            Some(Scn::ORACLE_OPEN_MARKER_WIDE),
            "CURRENT",
        )
        .unwrap();
        assert!(current.is_open());

        let window = crate::logminer::build_window(
            Scn::new(281_474_976_710_605),
            Scn::new(281_474_976_710_700),
            vec![inactive, current],
            vec![],
        )
        .unwrap();
        assert_eq!(window.segment_names(), vec!["redo01.log", "redo02.log"]);
        assert_eq!(window.covers_up_to, Scn::new(281_474_976_710_700));
    }

    #[test]
    fn test_archived_row_mapping() {
        let seg =
            archived_segment_from_row("1_7.arc".into(), Some(7), scn(1), scn(2), None, Some(2));
        assert!(seg.is_archived());
        assert!(seg.sealed);
        assert_eq!(seg.completed_at, None);
        assert_eq!(seg.dest_id, Some(2));
    }
}
