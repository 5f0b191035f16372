//! Shared fixture plus cross-entity scenarios.
//!
//! The fixture organisation: one boss, supervisors S1 and S2, managers M1, M2
//! under S1 and M3, M4 under S2. Each manager owns one family; F1 (M1's) has
//! one child C1.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use growthwatch_auth::{Hs256SessionCodec, Manager, ManagerChanges, Principal, Role, Scope};
use growthwatch_core::{
    Child, ChildId, Family, FamilyId, GrowthRecordId, ManagerId, NewChild, NewFamily,
    NewGrowthRecord,
};
use growthwatch_infra::store::{
    ChildRepository, FamilyRepository, GrowthRecordRepository, ManagerRepository,
};

use super::AppServices;

pub(crate) struct Org {
    pub svc: AppServices,
    pub boss: Principal,
    pub s1: Principal,
    pub s2: Principal,
    pub m1: Principal,
    pub m2: Principal,
    pub m3: Principal,
    pub m4: Principal,
    pub f1: Family,
    pub f2: Family,
    pub f3: Family,
    pub f4: Family,
    pub c1: Child,
}

pub(crate) fn new_family(name: &str) -> NewFamily {
    NewFamily {
        family_name: name.to_string(),
        country: "Ghana".to_string(),
        ..Default::default()
    }
}

pub(crate) fn new_child(family_id: FamilyId) -> NewChild {
    NewChild {
        name: "Ama".to_string(),
        birthday: NaiveDate::from_ymd_opt(2019, 5, 4).unwrap(),
        family_id,
        bone_age: Some(5.5),
    }
}

pub(crate) fn new_record(child_id: ChildId) -> NewGrowthRecord {
    NewGrowthRecord {
        child_id,
        record_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        height: 112.5,
        weight: 19.2,
        notes: None,
    }
}

impl Org {
    pub async fn build() -> Self {
        let svc = AppServices::in_memory(Hs256SessionCodec::new(b"test", Duration::minutes(5)));

        let boss = svc.seed("Boss", Role::Boss, None).await;
        let s1 = svc.seed("S1", Role::Supervisor, None).await;
        let s2 = svc.seed("S2", Role::Supervisor, None).await;
        let m1 = svc.seed("M1", Role::Manager, Some(s1.id)).await;
        let m2 = svc.seed("M2", Role::Manager, Some(s1.id)).await;
        let m3 = svc.seed("M3", Role::Manager, Some(s2.id)).await;
        let m4 = svc.seed("M4", Role::Manager, Some(s2.id)).await;

        let f1 = svc.seed_family(m1.id, "F1").await;
        let f2 = svc.seed_family(m2.id, "F2").await;
        let f3 = svc.seed_family(m3.id, "F3").await;
        let f4 = svc.seed_family(m4.id, "F4").await;

        let c1 = Child::create(
            ChildId::new(),
            new_child(f1.id),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        )
        .unwrap();
        svc.store.insert_child(c1.clone()).await.unwrap();

        Self {
            svc,
            boss,
            s1,
            s2,
            m1,
            m2,
            m3,
            m4,
            f1,
            f2,
            f3,
            f4,
            c1,
        }
    }

    fn staff(&self) -> [&Principal; 7] {
        [&self.boss, &self.s1, &self.s2, &self.m1, &self.m2, &self.m3, &self.m4]
    }
}

impl AppServices {
    async fn seed(&self, name: &str, role: Role, supervisor: Option<ManagerId>) -> Principal {
        let mut manager = Manager::seeded(ManagerId::new(), name, role).unwrap();
        manager.supervisor_id = supervisor;
        self.store.insert_manager(manager.clone()).await.unwrap();
        Principal::from(manager)
    }

    async fn seed_family(&self, owner: ManagerId, name: &str) -> Family {
        let family = Family::create(FamilyId::new(), owner, new_family(name)).unwrap();
        self.store.insert_family(family.clone()).await.unwrap();
        family
    }
}

/// Every supervisor link points at a supervisor that itself has none.
async fn hierarchy_is_two_levels(svc: &AppServices) -> bool {
    let everyone = svc.store.list_managers(&Scope::All).await.unwrap();
    everyone.iter().all(|m| match m.supervisor_id {
        None => true,
        Some(sid) => {
            m.role == Role::Manager
                && everyone
                    .iter()
                    .find(|s| s.id == sid)
                    .is_some_and(|s| s.role == Role::Supervisor && s.supervisor_id.is_none())
        }
    })
}

/// Every family is owned by a manager or supervisor, never a boss.
async fn families_owned_below_boss(svc: &AppServices) -> bool {
    let everyone = svc.store.list_managers(&Scope::All).await.unwrap();
    svc.store
        .list_families(&Scope::All)
        .await
        .unwrap()
        .iter()
        .all(|f| {
            everyone
                .iter()
                .find(|m| m.id == f.manager_id)
                .is_some_and(|m| matches!(m.role, Role::Manager | Role::Supervisor))
        })
}

#[tokio::test]
async fn managers_have_no_subordinates() {
    let org = Org::build().await;
    for m in [&org.m1, &org.m2, &org.m3, &org.m4] {
        assert!(org.svc.hierarchy.subordinates_of(m.id).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn every_family_owner_is_staff_below_boss() {
    let org = Org::build().await;
    assert!(families_owned_below_boss(&org.svc).await);

    // A family kept by a supervisor still counts as owned below the boss.
    org.svc.seed_family(org.s1.id, "Kept").await;
    assert!(families_owned_below_boss(&org.svc).await);
}

#[tokio::test]
async fn supervisor_sees_exactly_subordinate_families() {
    let org = Org::build().await;
    assert_eq!(org.svc.list_families(&org.s1).await.unwrap().len(), 2);
    assert_eq!(org.svc.list_families(&org.s2).await.unwrap().len(), 2);
}

#[tokio::test]
async fn deleting_a_family_cascades() {
    let org = Org::build().await;
    let record = org
        .svc
        .create_growth_record(&org.m1, new_record(org.c1.id))
        .await
        .unwrap();

    org.svc.delete_family(&org.m1, org.f1.id).await.unwrap();

    assert!(org.svc.store.get_child(org.c1.id).await.unwrap().is_none());
    assert!(org.svc.store.get_growth_record(record.id).await.unwrap().is_none());
    assert!(org.svc.list_children(&org.boss).await.unwrap().is_empty());
}

#[tokio::test]
async fn new_family_is_private_to_owner_chain() {
    let org = Org::build().await;
    let family = org
        .svc
        .create_family(&org.m1, None, new_family("Asante"))
        .await
        .unwrap();

    assert!(org.svc.get_family(&org.m1, family.id).await.is_ok());
    assert!(org.svc.get_family(&org.boss, family.id).await.is_ok());
    assert!(org.svc.get_family(&org.s1, family.id).await.is_ok());
    assert!(org.svc.get_family(&org.m2, family.id).await.is_err());
    assert!(!org
        .svc
        .list_families(&org.m2)
        .await
        .unwrap()
        .iter()
        .any(|f| f.id == family.id));
}

#[tokio::test]
async fn supervisors_reach_subordinates_not_themselves() {
    let org = Org::build().await;
    let own = org.svc.seed_family(org.s1.id, "Own").await;
    assert!(org.svc.get_family(&org.s1, own.id).await.is_err());
    assert_eq!(org.svc.list_families(&org.s1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_ids_are_not_found_for_everyone() {
    let org = Org::build().await;
    for principal in org.staff() {
        assert!(org.svc.get_family(principal, FamilyId::new()).await.is_err());
        assert!(org
            .svc
            .get_growth_record(principal, GrowthRecordId::new())
            .await
            .is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn boss_edits_keep_hierarchy_and_ownership_intact(
        edits in prop::collection::vec((0usize..7, 0usize..7, 0u8..3, 0usize..3), 1..24)
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let ok = rt.block_on(async {
            let org = Org::build().await;
            let ids: Vec<ManagerId> = org.staff().iter().map(|p| p.id).collect();

            for (target, other, kind, role) in edits {
                let changes = match kind {
                    0 => ManagerChanges {
                        role: Some([Role::Boss, Role::Supervisor, Role::Manager][role]),
                        ..Default::default()
                    },
                    1 => ManagerChanges {
                        supervisor_id: Some(Some(ids[other])),
                        ..Default::default()
                    },
                    _ => ManagerChanges {
                        supervisor_id: Some(None),
                        ..Default::default()
                    },
                };
                let _ = org.svc.update_manager(&org.boss, ids[target], changes).await;
                if !hierarchy_is_two_levels(&org.svc).await
                    || !families_owned_below_boss(&org.svc).await
                {
                    return false;
                }
            }
            true
        });
        prop_assert!(ok);
    }
}
