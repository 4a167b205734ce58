use crate::automaton::Automaton;
use crate::domain::AbstractDomain;
use crate::error::Result;
use crate::policy::{Emit, Intrinsic, IntrinsicTable, Policy};
use crate::program::{MethodRef, Program};

/// Class whose methods authorize, access and log.
pub const SERVER: &str = "Server";

/// Every `access` must eventually be followed by a `log`.
///
/// State `s1` means "accessed since the last log". It is not final, so an
/// infinite trace that stops logging after an access is rejected too.
pub fn logged_access_automaton() -> Result<Automaton> {
    let mut a = Automaton::new();
    for t in ["auth", "access", "log"] {
        a.add_symbol(t);
    }
    a.add_state("s0");
    a.add_state("s1");
    a.add_edge("s0", "s0", "auth")?;
    a.add_edge("s0", "s0", "log")?;
    a.add_edge("s0", "s1", "access")?;
    a.add_edge("s1", "s1", "auth")?;
    a.add_edge("s1", "s1", "access")?;
    a.add_edge("s1", "s0", "log")?;
    a.set_initial("s0")?;
    a.add_final("s0")?;
    Ok(a)
}

pub struct LoggedAccessPolicy {
    domain: AbstractDomain,
    intrinsics: IntrinsicTable,
}

impl LoggedAccessPolicy {
    pub fn new() -> Result<Self> {
        let domain = AbstractDomain::new(logged_access_automaton()?)?;
        let mut intrinsics = IntrinsicTable::new();
        for (signature, token) in [
            ("boolean verifyAuthorization()", "auth"),
            ("void readSensitiveData()", "access"),
            ("void logAccess()", "log"),
        ] {
            let signature = format!("<{}: {}>", SERVER, signature);
            intrinsics.insert(&signature, Emit::new(domain.read_symbol(token)?));
        }
        Ok(Self { domain, intrinsics })
    }
}

impl Policy for LoggedAccessPolicy {
    fn name(&self) -> &str {
        "logged-access"
    }

    fn domain(&self) -> &AbstractDomain {
        &self.domain
    }

    fn intrinsic(&self, program: &Program, method: MethodRef) -> Option<&dyn Intrinsic> {
        self.intrinsics.lookup(program, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_access_must_be_logged() {
        let policy = LoggedAccessPolicy::new().unwrap();
        let dom = policy.domain();
        let auth = dom.read_symbol("auth").unwrap();
        let access = dom.read_symbol("access").unwrap();
        let log = dom.read_symbol("log").unwrap();

        let logged = dom.multiply(&dom.multiply(&auth, &access), &log);
        assert!(dom.accepted(&logged));
        assert!(!dom.accepted(&dom.multiply(&auth, &access)));
        assert!(dom.accepted_inf(&dom.omega(&logged)));
        assert!(!dom.accepted_inf(&dom.multiply_inf(&access, &dom.omega(&auth))));
    }
}
