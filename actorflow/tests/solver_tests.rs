//! Type resolution through sessions and class hierarchies

use std::sync::Arc;

use actorflow::solver::{ConstraintSolver, Relation};
use actorflow::{KernelConfig, ResolutionPolicy, Session, SolverConfig};
use actorflow_types::{ClassHierarchy, TypeDescriptor, TypeLattice};
use pretty_assertions::assert_eq;

fn animals() -> TypeLattice {
    let mut classes = ClassHierarchy::new();
    classes.add_class("Animal", None).unwrap();
    classes.add_class("Dog", Some("Animal")).unwrap();
    classes.add_class("Cat", Some("Animal")).unwrap();
    TypeLattice::standard().with_classes(classes)
}

#[test]
fn test_objects_meet_at_common_ancestor() {
    let lattice = animals();
    let dog = TypeDescriptor::object("Dog").unwrap();
    let cat = TypeDescriptor::object("Cat").unwrap();
    let animal = TypeDescriptor::object("Animal").unwrap();

    assert_eq!(lattice.least_upper_bound(&dog, &cat), animal);
    assert!(lattice.is_subtype(&dog, &animal));
    assert!(!lattice.is_subtype(&dog, &cat));
}

#[test]
fn test_port_fed_by_dog_and_cat_resolves_to_animal() {
    let session = Session::new(animals(), KernelConfig::default());
    let mut solver = session.solver();
    let pet = solver.new_variable("shelter.in");
    solver
        .add_constraint(pet, Relation::GreaterOrEqual, TypeDescriptor::object("Dog").unwrap())
        .unwrap();
    solver
        .add_constraint(pet, Relation::GreaterOrEqual, TypeDescriptor::object("Cat").unwrap())
        .unwrap();

    let solution = solver.solve();
    assert!(solution.is_ok());
    assert_eq!(
        solution.resolved_type(pet),
        Some(&TypeDescriptor::object("Animal").unwrap())
    );
}

fn chain(config: SolverConfig) -> (ConstraintSolver, [actorflow_types::TypeVarId; 3]) {
    let mut solver = ConstraintSolver::new(Arc::new(TypeLattice::standard()), config);
    let a = solver.new_variable("portA");
    let b = solver.new_variable("portB");
    let c = solver.new_variable("portC");
    solver.add_constraint(a, Relation::Equal, TypeDescriptor::INT).unwrap();
    solver.add_constraint(c, Relation::Equal, TypeDescriptor::DOUBLE).unwrap();
    solver.add_constraint(a, Relation::LessOrEqual, b).unwrap();
    solver.add_constraint(b, Relation::LessOrEqual, c).unwrap();
    (solver, [a, b, c])
}

#[test]
fn test_resolution_policy_from_config_file() {
    let config = KernelConfig::from_toml_str(
        r#"
        [solver]
        resolution = "least"
        "#,
    )
    .unwrap();
    let session = Session::with_config(config);
    assert_eq!(session.config().solver.resolution, ResolutionPolicy::Least);

    let (mut solver, [_, b, _]) = chain(session.config().solver.clone());
    assert_eq!(solver.solve().resolved_type(b), Some(&TypeDescriptor::INT));

    let (mut solver, [_, b, _]) = chain(SolverConfig::default());
    assert_eq!(solver.solve().resolved_type(b), Some(&TypeDescriptor::DOUBLE));
}

#[test]
fn test_solving_twice_gives_identical_reports() {
    let (mut solver, _) = chain(SolverConfig::default());
    let first = solver.solve();
    let second = solver.solve();
    assert_eq!(first.variables, second.variables);
    assert_eq!(first.iterations, second.iterations);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_solution_goes_stale_after_topology_change() {
    let session = Session::standard();
    let solution = session.solver().solve();
    assert!(session.is_current(&solution));

    session.bump_version();
    assert!(!session.is_current(&solution));
}
