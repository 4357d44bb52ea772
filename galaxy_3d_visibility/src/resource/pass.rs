/// Render pass of a material: shader program plus render state.
///
/// Each material carries at most one pass per `PassType`. The renderer
/// looks up the opaque or alpha pass for main view batches and the shadow
/// pass for shadow batches.

use crate::error::Result;
use crate::engine_bail;
use crate::graphics_device::ShaderProgramHandle;
use super::sort_id::SortId;

/// Number of pass types a material can define
pub const NUM_PASS_TYPES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassType {
    Opaque = 0,
    Alpha = 1,
    Shadow = 2,
}

impl PassType {
    pub const ALL: [PassType; NUM_PASS_TYPES] = [PassType::Opaque, PassType::Alpha, PassType::Shadow];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Replace,
    Add,
    Multiply,
    Alpha,
    PremultipliedAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    #[default]
    Back,
    Front,
}

// ===== PASS =====

#[derive(Debug)]
pub struct Pass {
    sort_id: SortId,
    pass_type: PassType,
    shader_program: ShaderProgramHandle,
    blend_mode: BlendMode,
    cull_mode: CullMode,
    depth_write: bool,
    lit: bool,
}

// ===== DESCRIPTOR =====

/// Pass creation descriptor
#[derive(Debug, Clone)]
pub struct PassDesc {
    pub pass_type: PassType,
    pub shader_program: ShaderProgramHandle,
    pub blend_mode: BlendMode,
    pub cull_mode: CullMode,
    pub depth_write: bool,
    /// Receives clustered lighting
    pub lit: bool,
}

impl PassDesc {
    /// Opaque lit pass with default render state
    pub fn opaque(shader_program: ShaderProgramHandle) -> Self {
        Self {
            pass_type: PassType::Opaque,
            shader_program,
            blend_mode: BlendMode::Replace,
            cull_mode: CullMode::Back,
            depth_write: true,
            lit: true,
        }
    }

    /// Alpha-blended lit pass without depth write
    pub fn alpha(shader_program: ShaderProgramHandle) -> Self {
        Self {
            pass_type: PassType::Alpha,
            blend_mode: BlendMode::Alpha,
            depth_write: false,
            ..Self::opaque(shader_program)
        }
    }

    /// Unlit depth-only shadow pass
    pub fn shadow(shader_program: ShaderProgramHandle) -> Self {
        Self {
            pass_type: PassType::Shadow,
            lit: false,
            ..Self::opaque(shader_program)
        }
    }
}

// ===== PASS IMPLEMENTATION =====

impl Pass {
    /// Create pass from descriptor (internal use by ResourceRegistry)
    pub(crate) fn from_desc(desc: PassDesc, sort_id: SortId) -> Result<Self> {

        // ========== VALIDATION 1: Shadow passes are depth-only ==========
        if desc.pass_type == PassType::Shadow && (desc.lit || !desc.depth_write) {
            engine_bail!("galaxy3d::Pass", "Shadow pass must be unlit and write depth");
        }

        // ========== VALIDATION 2: Blending only in alpha passes ==========
        if desc.pass_type == PassType::Opaque && desc.blend_mode != BlendMode::Replace {
            engine_bail!("galaxy3d::Pass",
                "Opaque pass cannot use blend mode {:?}", desc.blend_mode);
        }

        Ok(Self {
            sort_id,
            pass_type: desc.pass_type,
            shader_program: desc.shader_program,
            blend_mode: desc.blend_mode,
            cull_mode: desc.cull_mode,
            depth_write: desc.depth_write,
            lit: desc.lit,
        })
    }

    // ===== ACCESSORS =====

    /// 16-bit id packed into batch sort keys
    pub fn id(&self) -> u16 {
        self.sort_id.get()
    }

    pub fn pass_type(&self) -> PassType {
        self.pass_type
    }

    pub fn shader_program(&self) -> ShaderProgramHandle {
        self.shader_program
    }

    /// Shader bits of the sort key; passes sharing a program sort together
    pub fn shader_hash(&self) -> u16 {
        (self.shader_program.0 ^ (self.shader_program.0 >> 16)) as u16
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    pub fn depth_write(&self) -> bool {
        self.depth_write
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }
}
