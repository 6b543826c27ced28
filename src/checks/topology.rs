use crate::checks::{
    CheckDescriptor, CheckError, CheckUnit, ParamSpec, fix_each, inspect_each, resolve_params,
};
use crate::models::config::{MAX_FACE_AREA, MAX_UV_BORDER_DISTANCE, MIN_EDGE_LENGTH, MIN_UV_AREA};
use crate::models::{CheckConfig, CheckResult, Locator};
use crate::scene::SceneProvider;

/// Defect query codes understood by the host.
///
/// Mesh queries use the mesh checker's codes directly; UV queries are offset
/// by [`UV_CODE_BASE`] so both families share one code space.
pub mod codes {
    pub const TRIANGLES: u32 = 0;
    pub const NGONS: u32 = 1;
    pub const NON_MANIFOLD_EDGES: u32 = 2;
    pub const LAMINA_FACES: u32 = 3;
    pub const BI_VALENT_FACES: u32 = 4;
    pub const ZERO_AREA_FACES: u32 = 5;
    pub const MESH_BORDER: u32 = 6;
    pub const CREASE_EDGES: u32 = 7;
    pub const ZERO_LENGTH_EDGES: u32 = 8;
    pub const UNFROZEN_VERTICES: u32 = 9;

    pub const UV_CODE_BASE: u32 = 100;
    pub const UDIM_INTERSECTIONS: u32 = UV_CODE_BASE;
    pub const NO_UV_FACES: u32 = UV_CODE_BASE + 1;
    pub const ZERO_AREA_UV_FACES: u32 = UV_CODE_BASE + 2;
    pub const NEGATIVE_SPACE_UVS: u32 = UV_CODE_BASE + 4;
}

/// A check that forwards to one of the host's native defect queries.
///
/// All the host's topology and UV queries have the same shape and differ only
/// by their code, so a single parameterized unit covers them.
#[derive(Debug, Clone)]
pub struct TopologyCheck {
    descriptor: CheckDescriptor,
    code: u32,
    params: Vec<ParamSpec>,
}

impl TopologyCheck {
    pub fn new(code: u32, descriptor: CheckDescriptor) -> Self {
        Self {
            descriptor,
            code,
            params: Vec::new(),
        }
    }

    /// Declare a parameter forwarded to the host query
    pub fn with_param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn code(&self) -> u32 {
        self.code
    }

    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// The host's built-in mesh and UV queries
    pub fn defaults() -> Vec<TopologyCheck> {
        use codes::*;

        vec![
            TopologyCheck::new(TRIANGLES, CheckDescriptor::new("Triangles", "Mesh").warning()),
            TopologyCheck::new(NGONS, CheckDescriptor::new("N-gons", "Mesh")),
            TopologyCheck::new(
                NON_MANIFOLD_EDGES,
                CheckDescriptor::new("Non-manifold Edges", "Mesh"),
            ),
            TopologyCheck::new(LAMINA_FACES, CheckDescriptor::new("Lamina Faces", "Mesh")),
            TopologyCheck::new(BI_VALENT_FACES, CheckDescriptor::new("Bi-valent Faces", "Mesh")),
            TopologyCheck::new(ZERO_AREA_FACES, CheckDescriptor::new("Zero-area Faces", "Mesh"))
                .with_param(ParamSpec::optional(MAX_FACE_AREA, 0.000001)),
            TopologyCheck::new(
                MESH_BORDER,
                CheckDescriptor::new("Mesh Border Edges", "Mesh").warning(),
            ),
            TopologyCheck::new(CREASE_EDGES, CheckDescriptor::new("Crease Edges", "Mesh").warning()),
            TopologyCheck::new(
                ZERO_LENGTH_EDGES,
                CheckDescriptor::new("Zero-length Edges", "Mesh"),
            )
            .with_param(ParamSpec::optional(MIN_EDGE_LENGTH, 0.000001)),
            TopologyCheck::new(
                UNFROZEN_VERTICES,
                CheckDescriptor::new("Unfrozen Vertices", "Mesh").fixable(),
            ),
            TopologyCheck::new(
                UDIM_INTERSECTIONS,
                CheckDescriptor::new("UDIM Border Intersections", "UV"),
            )
            .with_param(ParamSpec::optional(MAX_UV_BORDER_DISTANCE, 0.0)),
            TopologyCheck::new(NO_UV_FACES, CheckDescriptor::new("Faces Without UVs", "UV")),
            TopologyCheck::new(
                ZERO_AREA_UV_FACES,
                CheckDescriptor::new("Zero-area UV Faces", "UV"),
            )
            .with_param(ParamSpec::optional(MIN_UV_AREA, 0.000001)),
            TopologyCheck::new(
                NEGATIVE_SPACE_UVS,
                CheckDescriptor::new("Negative Space UVs", "UV").warning(),
            ),
        ]
    }
}

impl CheckUnit for TopologyCheck {
    fn descriptor(&self) -> &CheckDescriptor {
        &self.descriptor
    }

    fn check(
        &self,
        scene: &dyn SceneProvider,
        objects: &[Locator],
        config: &CheckConfig,
    ) -> Result<Vec<CheckResult>, CheckError> {
        let params = resolve_params(&self.descriptor.name, &self.params, config)?;

        Ok(inspect_each(&self.descriptor.name, objects, |object| {
            scene.query_topology_defects(object, self.code, &params)
        }))
    }

    /// Re-runs the query in the host's repair mode, for queries marked fixable
    fn fix(&self, scene: &mut dyn SceneProvider, results: &[CheckResult]) -> Result<(), CheckError> {
        if !self.descriptor.is_fixable {
            return Ok(());
        }

        fix_each(&self.descriptor.name, results, |result| {
            scene.repair_topology_defects(result.target(), self.code)?;
            tracing::info!("{}: repaired {}", self.descriptor.name, result.target());
            Ok(())
        })
    }
}
