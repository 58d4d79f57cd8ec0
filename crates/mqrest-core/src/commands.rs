//! Per-command convenience methods.
//!
//! Every method here is a thin wrapper over [`Session::execute`], generated
//! from the tables below. Commands not listed can go through
//! [`Session::run_command`].

use serde_json::Value;

use crate::error::Result;
use crate::mapping::Attributes;
use crate::session::{CommandRequest, Session};

/// Optional parameters shared by the command methods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOptions {
    /// Attributes to set, or to filter on for DISPLAY.
    pub request_parameters: Attributes,
    /// Attributes to return. DISPLAY defaults to `all`.
    pub response_parameters: Option<Vec<String>>,
    /// Filter clause for list DISPLAY commands.
    pub where_clause: Option<String>,
}

impl CommandOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_parameters(mut self, parameters: Attributes) -> Self {
        self.request_parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request_parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_response_parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.response_parameters = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    fn into_request(self, verb: &str, qualifier: &str, name: Option<&str>) -> CommandRequest {
        let mut request =
            CommandRequest::new(verb, qualifier).with_parameters(self.request_parameters);
        request.name = name.map(str::to_string);
        request.response_parameters = self.response_parameters;
        request.where_clause = self.where_clause;
        request
    }
}

/// DISPLAY commands whose name defaults to `*`.
macro_rules! display_wildcard_commands {
    ($($method:ident => $qualifier:literal),* $(,)?) => {
        impl Session {
            $(
                #[doc = concat!("`DISPLAY ", $qualifier, "`. The name defaults to `*`.")]
                pub fn $method(
                    &mut self,
                    name: Option<&str>,
                    options: CommandOptions,
                ) -> Result<Vec<Attributes>> {
                    self.display_list($qualifier, Some(name.unwrap_or("*")), options)
                }
            )*
        }
    };
}

/// DISPLAY commands for single-instance objects.
macro_rules! display_singleton_commands {
    ($($method:ident => $qualifier:literal),* $(,)?) => {
        impl Session {
            $(
                #[doc = concat!("`DISPLAY ", $qualifier, "`. Returns the first record, if any.")]
                pub fn $method(&mut self, options: CommandOptions) -> Result<Option<Attributes>> {
                    let mut options = options;
                    options.where_clause = None;
                    let records = self.execute(options.into_request("DISPLAY", $qualifier, None))?;
                    Ok(records.into_iter().next())
                }
            )*
        }
    };
}

/// DISPLAY commands with an optional name.
macro_rules! display_list_commands {
    ($($method:ident => $qualifier:literal),* $(,)?) => {
        impl Session {
            $(
                #[doc = concat!("`DISPLAY ", $qualifier, "`.")]
                pub fn $method(
                    &mut self,
                    name: Option<&str>,
                    options: CommandOptions,
                ) -> Result<Vec<Attributes>> {
                    self.display_list($qualifier, name, options)
                }
            )*
        }
    };
}

/// Commands on a named object that return nothing.
macro_rules! named_commands {
    ($($method:ident => $verb:literal $qualifier:literal),* $(,)?) => {
        impl Session {
            $(
                #[doc = concat!("`", $verb, " ", $qualifier, "`.")]
                pub fn $method(&mut self, name: &str, options: CommandOptions) -> Result<()> {
                    self.void_command($verb, $qualifier, Some(name), options)
                }
            )*
        }
    };
}

/// Commands without an object name.
macro_rules! unnamed_commands {
    ($($method:ident => $verb:literal $qualifier:literal),* $(,)?) => {
        impl Session {
            $(
                #[doc = concat!("`", $verb, " ", $qualifier, "`.")]
                pub fn $method(&mut self, options: CommandOptions) -> Result<()> {
                    self.void_command($verb, $qualifier, None, options)
                }
            )*
        }
    };
}

impl Session {
    /// Run any verb/qualifier pair and return its records.
    pub fn run_command(
        &mut self,
        verb: &str,
        qualifier: &str,
        name: Option<&str>,
        options: CommandOptions,
    ) -> Result<Vec<Attributes>> {
        self.execute(options.into_request(verb, qualifier, name))
    }

    fn display_list(
        &mut self,
        qualifier: &str,
        name: Option<&str>,
        options: CommandOptions,
    ) -> Result<Vec<Attributes>> {
        self.execute(options.into_request("DISPLAY", qualifier, name))
    }

    fn void_command(
        &mut self,
        verb: &str,
        qualifier: &str,
        name: Option<&str>,
        options: CommandOptions,
    ) -> Result<()> {
        let mut options = options;
        options.where_clause = None;
        self.execute(options.into_request(verb, qualifier, name))?;
        Ok(())
    }
}

display_wildcard_commands! {
    display_queue => "QUEUE",
    display_channel => "CHANNEL",
}

display_singleton_commands! {
    display_qmgr => "QMGR",
    display_qmstatus => "QMSTATUS",
    display_cmdserv => "CMDSERV",
}

display_list_commands! {
    display_apstatus => "APSTATUS",
    display_archive => "ARCHIVE",
    display_authinfo => "AUTHINFO",
    display_authrec => "AUTHREC",
    display_authserv => "AUTHSERV",
    display_cfstatus => "CFSTATUS",
    display_cfstruct => "CFSTRUCT",
    display_chinit => "CHINIT",
    display_chlauth => "CHLAUTH",
    display_chstatus => "CHSTATUS",
    display_clusqmgr => "CLUSQMGR",
    display_comminfo => "COMMINFO",
    display_conn => "CONN",
    display_entauth => "ENTAUTH",
    display_group => "GROUP",
    display_listener => "LISTENER",
    display_log => "LOG",
    display_lsstatus => "LSSTATUS",
    display_maxsmsgs => "MAXSMSGS",
    display_namelist => "NAMELIST",
    display_policy => "POLICY",
    display_process => "PROCESS",
    display_pubsub => "PUBSUB",
    display_qstatus => "QSTATUS",
    display_sbstatus => "SBSTATUS",
    display_security => "SECURITY",
    display_service => "SERVICE",
    display_smds => "SMDS",
    display_smdsconn => "SMDSCONN",
    display_stgclass => "STGCLASS",
    display_sub => "SUB",
    display_svstatus => "SVSTATUS",
    display_system => "SYSTEM",
    display_tcluster => "TCLUSTER",
    display_thread => "THREAD",
    display_topic => "TOPIC",
    display_tpstatus => "TPSTATUS",
    display_trace => "TRACE",
    display_usage => "USAGE",
}

named_commands! {
    define_qlocal => "DEFINE" "QLOCAL",
    define_qremote => "DEFINE" "QREMOTE",
    define_qalias => "DEFINE" "QALIAS",
    define_qmodel => "DEFINE" "QMODEL",
    define_channel => "DEFINE" "CHANNEL",
    define_authinfo => "DEFINE" "AUTHINFO",
    define_buffpool => "DEFINE" "BUFFPOOL",
    define_cfstruct => "DEFINE" "CFSTRUCT",
    define_comminfo => "DEFINE" "COMMINFO",
    define_listener => "DEFINE" "LISTENER",
    define_log => "DEFINE" "LOG",
    define_maxsmsgs => "DEFINE" "MAXSMSGS",
    define_namelist => "DEFINE" "NAMELIST",
    define_process => "DEFINE" "PROCESS",
    define_psid => "DEFINE" "PSID",
    define_service => "DEFINE" "SERVICE",
    define_stgclass => "DEFINE" "STGCLASS",
    define_sub => "DEFINE" "SUB",
    define_topic => "DEFINE" "TOPIC",

    alter_qlocal => "ALTER" "QLOCAL",
    alter_qremote => "ALTER" "QREMOTE",
    alter_qalias => "ALTER" "QALIAS",
    alter_qmodel => "ALTER" "QMODEL",
    alter_authinfo => "ALTER" "AUTHINFO",
    alter_buffpool => "ALTER" "BUFFPOOL",
    alter_cfstruct => "ALTER" "CFSTRUCT",
    alter_channel => "ALTER" "CHANNEL",
    alter_comminfo => "ALTER" "COMMINFO",
    alter_listener => "ALTER" "LISTENER",
    alter_namelist => "ALTER" "NAMELIST",
    alter_process => "ALTER" "PROCESS",
    alter_psid => "ALTER" "PSID",
    alter_security => "ALTER" "SECURITY",
    alter_service => "ALTER" "SERVICE",
    alter_smds => "ALTER" "SMDS",
    alter_stgclass => "ALTER" "STGCLASS",
    alter_sub => "ALTER" "SUB",
    alter_topic => "ALTER" "TOPIC",
    alter_trace => "ALTER" "TRACE",

    delete_queue => "DELETE" "QUEUE",
    delete_qlocal => "DELETE" "QLOCAL",
    delete_qremote => "DELETE" "QREMOTE",
    delete_qalias => "DELETE" "QALIAS",
    delete_qmodel => "DELETE" "QMODEL",
    delete_channel => "DELETE" "CHANNEL",
    delete_authinfo => "DELETE" "AUTHINFO",
    delete_authrec => "DELETE" "AUTHREC",
    delete_buffpool => "DELETE" "BUFFPOOL",
    delete_cfstruct => "DELETE" "CFSTRUCT",
    delete_comminfo => "DELETE" "COMMINFO",
    delete_listener => "DELETE" "LISTENER",
    delete_namelist => "DELETE" "NAMELIST",
    delete_policy => "DELETE" "POLICY",
    delete_process => "DELETE" "PROCESS",
    delete_psid => "DELETE" "PSID",
    delete_service => "DELETE" "SERVICE",
    delete_stgclass => "DELETE" "STGCLASS",
    delete_sub => "DELETE" "SUB",
    delete_topic => "DELETE" "TOPIC",

    start_channel => "START" "CHANNEL",
    start_chinit => "START" "CHINIT",
    start_listener => "START" "LISTENER",
    start_service => "START" "SERVICE",
    start_smdsconn => "START" "SMDSCONN",
    start_trace => "START" "TRACE",

    stop_channel => "STOP" "CHANNEL",
    stop_chinit => "STOP" "CHINIT",
    stop_conn => "STOP" "CONN",
    stop_listener => "STOP" "LISTENER",
    stop_service => "STOP" "SERVICE",
    stop_smdsconn => "STOP" "SMDSCONN",
    stop_trace => "STOP" "TRACE",

    ping_channel => "PING" "CHANNEL",
    clear_qlocal => "CLEAR" "QLOCAL",
    clear_topicstr => "CLEAR" "TOPICSTR",
    refresh_cluster => "REFRESH" "CLUSTER",
    refresh_security => "REFRESH" "SECURITY",

    reset_cfstruct => "RESET" "CFSTRUCT",
    reset_channel => "RESET" "CHANNEL",
    reset_cluster => "RESET" "CLUSTER",
    reset_qstats => "RESET" "QSTATS",
    reset_smds => "RESET" "SMDS",
    reset_tpipe => "RESET" "TPIPE",

    resolve_channel => "RESOLVE" "CHANNEL",
    resolve_indoubt => "RESOLVE" "INDOUBT",

    set_archive => "SET" "ARCHIVE",
    set_authrec => "SET" "AUTHREC",
    set_chlauth => "SET" "CHLAUTH",
    set_log => "SET" "LOG",
    set_policy => "SET" "POLICY",
    set_system => "SET" "SYSTEM",

    archive_log => "ARCHIVE" "LOG",
    backup_cfstruct => "BACKUP" "CFSTRUCT",
    recover_bsds => "RECOVER" "BSDS",
    recover_cfstruct => "RECOVER" "CFSTRUCT",
    purge_channel => "PURGE" "CHANNEL",
    move_qlocal => "MOVE" "QLOCAL",
    rverify_security => "RVERIFY" "SECURITY",
}

unnamed_commands! {
    alter_qmgr => "ALTER" "QMGR",
    start_qmgr => "START" "QMGR",
    start_cmdserv => "START" "CMDSERV",
    stop_qmgr => "STOP" "QMGR",
    stop_cmdserv => "STOP" "CMDSERV",
    ping_qmgr => "PING" "QMGR",
    refresh_qmgr => "REFRESH" "QMGR",
    reset_qmgr => "RESET" "QMGR",
    resume_qmgr => "RESUME" "QMGR",
    suspend_qmgr => "SUSPEND" "QMGR",
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_into_request() {
        let request = CommandOptions::new()
            .with_parameter("max_queue_depth", 5000)
            .with_response_parameters(["queue_name"])
            .with_where("current_queue_depth GT 10")
            .into_request("DISPLAY", "QUEUE", Some("APP.*"));

        assert!(request.display);
        assert_eq!(request.name.as_deref(), Some("APP.*"));
        assert_eq!(request.parameters["max_queue_depth"], 5000);
        assert_eq!(request.response_parameters, Some(vec!["queue_name".to_string()]));
        assert_eq!(request.where_clause.as_deref(), Some("current_queue_depth GT 10"));
    }

    #[test]
    fn test_default_options_are_empty() {
        let request = CommandOptions::default().into_request("DEFINE", "QLOCAL", Some("Q1"));
        assert!(!request.display);
        assert!(request.parameters.is_empty());
        assert!(request.response_parameters.is_none());
    }
}
