//! CLI subcommand definitions

use clap::{Subcommand, ValueEnum};

use crate::core::{Period, Stage, Status};

/// Bucket size of the dashboard activity chart
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub(crate) enum ChartView {
    /// Last 14 days
    Day,
    /// Last 12 months (default)
    #[default]
    Month,
    /// Last 5 years
    Year,
}

impl From<ChartView> for Period {
    fn from(view: ChartView) -> Self {
        match view {
            ChartView::Day => Period::Day,
            ChartView::Month => Period::Month,
            ChartView::Year => Period::Year,
        }
    }
}

/// Main CLI commands
#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Sign in with e-mail and password
    Login {
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Read from stdin when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Send a password reset e-mail
    ForgotPassword {
        #[arg(long)]
        email: String,
        /// Page the e-mail links back to
        #[arg(long, value_name = "URL")]
        redirect_to: Option<String>,
    },
    /// Set a new password using the recovery link from the e-mail
    ResetPassword {
        /// Full recovery link as received
        #[arg(long, value_name = "URL")]
        link: Option<String>,
        #[arg(long)]
        access_token: Option<String>,
        #[arg(long)]
        token_hash: Option<String>,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Browse sample data without an account
    Demo,
    /// Show who is signed in
    Whoami,
    /// Summary, activity chart and monthly snapshot (default)
    Dashboard {
        #[arg(long, value_enum, default_value = "month")]
        view: ChartView,
        /// Snapshot month (YYYY-MM), defaults to the current month
        #[arg(long, value_name = "YYYY-MM")]
        month: Option<String>,
    },
    /// List applications
    List {
        #[arg(long)]
        stage: Option<Stage>,
        #[arg(long)]
        status: Option<Status>,
        /// Company name contains this text
        #[arg(long)]
        company: Option<String>,
        /// Role or company contains this text
        #[arg(long)]
        search: Option<String>,
        /// Applied on or after (YYYYMMDD or YYYY-MM-DD)
        #[arg(short, long)]
        since: Option<String>,
        /// Applied on or before (YYYYMMDD or YYYY-MM-DD)
        #[arg(short, long)]
        until: Option<String>,
        /// Only applications with an overdue follow-up
        #[arg(long)]
        overdue: bool,
        /// Only stale applications
        #[arg(long)]
        stale: bool,
    },
    /// Show one application with notes, links and follow-ups
    Show { id: String },
    /// Add an application
    Add {
        #[arg(long)]
        company: String,
        #[arg(long)]
        role: String,
        #[arg(long)]
        stage: Option<Stage>,
        /// Applied date (YYYYMMDD or YYYY-MM-DD)
        #[arg(long)]
        applied: Option<String>,
        /// Job posting URL
        #[arg(long)]
        link: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Change stage and/or status
    Update {
        id: String,
        #[arg(long)]
        stage: Option<Stage>,
        #[arg(long)]
        status: Option<Status>,
    },
    /// Schedule a follow-up, completing any open one
    FollowUp {
        id: String,
        /// Due day (YYYY-MM-DD)
        #[arg(long)]
        due: String,
        #[arg(long)]
        note: Option<String>,
    },
    /// Mark a follow-up as done
    Done {
        follow_up_id: String,
        /// Application to mark as touched
        #[arg(long, value_name = "ID")]
        application: Option<String>,
    },
    /// Add a note to an application
    Note { id: String, content: String },
    /// Attach a link to an application
    Link {
        id: String,
        url: String,
        #[arg(long)]
        label: Option<String>,
    },
    /// Delete an application
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

impl Commands {
    /// Account calls that only the auth API can answer; refused with `--offline`
    pub(crate) fn needs_network(&self) -> bool {
        matches!(
            self,
            Commands::Login { .. }
                | Commands::Signup { .. }
                | Commands::ForgotPassword { .. }
                | Commands::ResetPassword { .. }
        )
    }
}
