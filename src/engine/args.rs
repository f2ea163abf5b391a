use crate::model::RunOptions;

/// Build the sqlmap argv from the selected options.
///
/// The token order is a compatibility contract with the output this panel
/// scrapes: base invocation, risk/level/threads, enumeration flags, quick
/// enumerations, dump flags (with `--dump-all` taking precedence and ignoring
/// selectors), then any extra raw arguments split with shell rules.
pub fn build_sqlmap_args(program: &str, target_url: &str, options: &RunOptions) -> Vec<String> {
    let mut args: Vec<String> = vec![
        program.to_string(),
        "-u".into(),
        target_url.to_string(),
        "--batch".into(),
        "--answers=follow=Y".into(),
    ];

    if let Some(risk) = options.risk {
        args.push("--risk".into());
        args.push(risk.to_string());
    }
    if let Some(level) = options.level {
        args.push("--level".into());
        args.push(level.to_string());
    }
    if let Some(threads) = options.threads {
        args.push("--threads".into());
        args.push(threads.to_string());
    }

    if options.dbs {
        args.push("--dbs".into());
    }

    if options.tables {
        args.push("--tables".into());
        // Without a DB selection sqlmap is left to ask or error on its own.
        if let Some(db) = options.selected_db.as_deref() {
            args.push("-D".into());
            args.push(db.to_string());
        }
    }

    if options.columns {
        if let Some(db) = options.selected_db.as_deref() {
            args.push("-D".into());
            args.push(db.to_string());
        }
        args.push("--columns".into());
        if let Some(table) = options.selected_table.as_deref() {
            args.push("-T".into());
            args.push(table.to_string());
        }
    }

    if options.users {
        args.push("--users".into());
    }
    if options.passwords {
        args.push("--passwords".into());
    }
    if options.roles {
        args.push("--roles".into());
    }

    if options.dump_all {
        args.push("--dump-all".into());
    } else if options.dump {
        if let Some(db) = options.selected_db.as_deref() {
            args.push("-D".into());
            args.push(db.to_string());
        }
        args.push("--dump".into());
        if let Some(table) = options.selected_table.as_deref() {
            args.push("-T".into());
            args.push(table.to_string());
        }
    }

    // Quoting is validated where extra_args is entered; an unsplittable
    // string never reaches a launch.
    if let Some(extra) = options.extra_args.as_deref() {
        if !extra.trim().is_empty() {
            if let Ok(tokens) = shell_words::split(extra) {
                args.extend(tokens);
            }
        }
    }

    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<String> {
        vec![
            "sqlmap".into(),
            "-u".into(),
            "http://t/".into(),
            "--batch".into(),
            "--answers=follow=Y".into(),
        ]
    }

    #[test]
    fn default_options_produce_base_invocation_only() {
        let args = build_sqlmap_args("sqlmap", "http://t/", &RunOptions::default());
        assert_eq!(args, base());
    }

    #[test]
    fn risk_level_threads_appear_in_fixed_order() {
        let opts = RunOptions {
            threads: Some(4),
            level: Some(2),
            risk: Some(3),
            ..Default::default()
        };
        let args = build_sqlmap_args("sqlmap", "http://t/", &opts);
        let mut want = base();
        want.extend(
            ["--risk", "3", "--level", "2", "--threads", "4"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(args, want);
    }

    #[test]
    fn dump_with_db_and_table_ends_with_selector_sequence() {
        let opts = RunOptions {
            dump: true,
            selected_db: Some("dvwa".into()),
            selected_table: Some("users".into()),
            ..Default::default()
        };
        let args = build_sqlmap_args("sqlmap", "http://t/", &opts);
        assert_eq!(
            &args[args.len() - 5..],
            &["-D", "dvwa", "--dump", "-T", "users"]
        );
    }

    #[test]
    fn dump_all_wins_and_ignores_selectors() {
        let opts = RunOptions {
            dump: true,
            dump_all: true,
            selected_db: Some("dvwa".into()),
            selected_table: Some("users".into()),
            ..Default::default()
        };
        let args = build_sqlmap_args("sqlmap", "http://t/", &opts);
        let mut want = base();
        want.push("--dump-all".into());
        assert_eq!(args, want);
        assert!(!args.iter().any(|a| a == "-D" || a == "-T"));
    }

    #[test]
    fn tables_without_db_requests_tables_alone() {
        let opts = RunOptions {
            tables: true,
            ..Default::default()
        };
        let args = build_sqlmap_args("sqlmap", "http://t/", &opts);
        let mut want = base();
        want.push("--tables".into());
        assert_eq!(args, want);
    }

    #[test]
    fn columns_prefixes_db_selector_before_columns_flag() {
        let opts = RunOptions {
            columns: true,
            selected_db: Some("dvwa".into()),
            ..Default::default()
        };
        let args = build_sqlmap_args("sqlmap", "http://t/", &opts);
        let mut want = base();
        want.extend(["-D", "dvwa", "--columns"].iter().map(|s| s.to_string()));
        assert_eq!(args, want);
    }

    #[test]
    fn extra_args_are_shell_split_and_appended_last() {
        let opts = RunOptions {
            dbs: true,
            extra_args: Some("--random-agent --tamper=\"space2comment\"".into()),
            ..Default::default()
        };
        let args = build_sqlmap_args("sqlmap", "http://t/", &opts);
        let mut want = base();
        want.push("--dbs".into());
        want.push("--random-agent".into());
        want.push("--tamper=space2comment".into());
        assert_eq!(args, want);
    }

    #[test]
    fn quick_enumerations_append_independently() {
        let opts = RunOptions {
            users: true,
            roles: true,
            ..Default::default()
        };
        let args = build_sqlmap_args("sqlmap", "http://t/", &opts);
        let mut want = base();
        want.push("--users".into());
        want.push("--roles".into());
        assert_eq!(args, want);
    }
}
