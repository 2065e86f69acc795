//! Registry behaviour across many groups and stations.

use aprsbbs_groups::{GroupError, GroupName, GroupRegistry};
use aprsbbs_protocol::Identity;

fn id(call: &str) -> Identity {
    Identity::new(call).expect("valid call")
}

fn name(raw: &str) -> GroupName {
    GroupName::new(raw).expect("valid name")
}

#[test]
fn test_operations_on_one_group_leave_others_untouched() {
    let mut reg = GroupRegistry::new();
    reg.create(&name("alpha"), &id("IZ1ABC")).expect("create alpha");
    reg.create(&name("bravo"), &id("K1XYZ")).expect("create bravo");
    reg.join(&name("bravo"), &id("IZ1ABC")).expect("join bravo");

    let bravo_before = reg.members(&name("bravo")).expect("bravo");

    reg.join(&name("alpha"), &id("N2QQQ")).expect("join alpha");
    reg.leave(&name("alpha"), &id("IZ1ABC")).expect("leave alpha");
    let _ = reg.join(&name("alpha"), &id("N2QQQ"));
    let _ = reg.leave(&name("alpha"), &id("K1XYZ"));

    assert_eq!(reg.members(&name("bravo")).expect("bravo"), bravo_before);
    assert_eq!(reg.members(&name("alpha")).expect("alpha"), vec![id("N2QQQ")]);
}

#[test]
fn test_full_lifecycle() {
    let mut reg = GroupRegistry::new();
    let group = name("Nets");
    let callers = ["IZ1ABC", "K1XYZ-7", "N2QQQ"].map(id);

    reg.create(&group, &callers[0]).expect("create");
    for caller in &callers[1..] {
        reg.join(&group, caller).expect("join");
    }
    assert_eq!(reg.members(&name("NETS")).expect("members").len(), 3);

    for caller in &callers {
        reg.leave(&group, caller).expect("leave");
    }
    assert!(!reg.exists(&group));
    assert_eq!(
        reg.members(&group),
        Err(GroupError::NoSuchGroup(name("nets")))
    );
}
